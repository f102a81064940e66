//! Heart-rate anomaly classification.

use serde::{Deserialize, Serialize};

/// Classification context selecting the anomaly threshold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// General adult resting threshold.
    #[default]
    Adult,
    /// Trained athletes have a lower resting heart rate.
    Athlete,
}

impl Profile {
    /// Resting heart rate above which a reading is anomalous, in bpm.
    pub fn threshold_bpm(self) -> f64 {
        match self {
            Self::Adult => 100.0,
            Self::Athlete => 80.0,
        }
    }
}

/// Verdict for one averaged measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// `true` when the average exceeds the profile threshold.
    pub anomalous: bool,
    /// Human-readable explanation embedding the measurement and threshold.
    pub message: String,
    /// Threshold the measurement was compared against.
    pub threshold_bpm: f64,
}

/// Classify an averaged heart rate against `profile`.
///
/// Callers must not pass an average computed from zero samples.
pub fn classify(average_bpm: f64, profile: Profile) -> Classification {
    let threshold_bpm = profile.threshold_bpm();
    let anomalous = average_bpm > threshold_bpm;
    let measured = format_bpm(average_bpm, threshold_bpm);
    let message = if anomalous {
        format!(
            "High heart rate detected! Measured: {measured} BPM (Threshold: {threshold_bpm:.0} BPM). It's time for a break."
        )
    } else {
        format!("Heart rate is normal: {measured} BPM (Threshold: {threshold_bpm:.0} BPM).")
    };

    Classification {
        anomalous,
        message,
        threshold_bpm,
    }
}

/// One decimal, unless rounding would hide that a reading is above the
/// threshold.
fn format_bpm(average_bpm: f64, threshold_bpm: f64) -> String {
    let short = format!("{average_bpm:.1}");
    let rounded_over = short.parse::<f64>().is_ok_and(|r| r > threshold_bpm);
    if average_bpm > threshold_bpm && !rounded_over {
        average_bpm.to_string()
    } else {
        short
    }
}
