//! Synthetic capture collaborators.
//!
//! Deterministic camera and estimator implementations that need no hardware.
//! The headless host uses them to simulate a reading, and tests use them to
//! drive check-ins through every exit path.

use super::{Camera, CaptureError, Frame, FrameStream, HeartRateEstimator};
use image::Rgb;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const FRAME_SIZE: u32 = 8;
const SKIN_TONE: Rgb<u8> = Rgb([198, 134, 110]);

/// Shared counters observing a [`SyntheticCamera`].
#[derive(Debug, Clone, Default)]
pub struct CameraStats {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    frames: Arc<AtomicUsize>,
}

impl CameraStats {
    /// Successful opens.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams released.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Frames handed out across all streams.
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

/// Camera producing solid-color frames.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    unavailable: Option<String>,
    frame_limit: Option<usize>,
    frame_interval: Duration,
    stats: CameraStats,
}

impl SyntheticCamera {
    /// Camera yielding frames until the caller stops reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera whose `open` always fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    /// End each stream after `limit` frames.
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Sleep between frames to mimic a real frame rate.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Report opens, closes and frames into `stats`.
    pub fn with_stats(mut self, stats: CameraStats) -> Self {
        self.stats = stats;
        self
    }
}

impl Camera for SyntheticCamera {
    fn open(&mut self) -> Result<Box<dyn FrameStream>, CaptureError> {
        if let Some(reason) = &self.unavailable {
            return Err(CaptureError::Unavailable(reason.clone()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            remaining: self.frame_limit,
            frame_interval: self.frame_interval,
            stats: self.stats.clone(),
        }))
    }
}

struct SyntheticStream {
    remaining: Option<usize>,
    frame_interval: Duration,
    stats: CameraStats,
}

impl FrameStream for SyntheticStream {
    fn read_frame(&mut self) -> Option<Frame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }
        self.stats.frames.fetch_add(1, Ordering::SeqCst);
        Some(Frame::from_pixel(FRAME_SIZE, FRAME_SIZE, SKIN_TONE))
    }

    fn close(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Estimator reporting a fixed heart rate after a warm-up.
#[derive(Debug, Clone)]
pub struct ConstantEstimator {
    bpm: f64,
    warmup_frames: usize,
    seen: usize,
}

impl ConstantEstimator {
    /// Estimator reporting `bpm` from the first frame.
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            warmup_frames: 0,
            seen: 0,
        }
    }

    /// Report no reading for the first `frames` frames.
    pub fn with_warmup(mut self, frames: usize) -> Self {
        self.warmup_frames = frames;
        self
    }
}

impl HeartRateEstimator for ConstantEstimator {
    fn process_frame(&mut self, _frame: &Frame) -> Option<f64> {
        self.seen += 1;
        (self.seen > self.warmup_frames).then_some(self.bpm)
    }
}

/// Estimator replaying a fixed sequence of readings, then `None`.
#[derive(Debug, Clone)]
pub struct SequenceEstimator {
    readings: std::vec::IntoIter<Option<f64>>,
}

impl SequenceEstimator {
    /// Replay `readings` one per frame.
    pub fn new(readings: Vec<Option<f64>>) -> Self {
        Self {
            readings: readings.into_iter(),
        }
    }
}

impl HeartRateEstimator for SequenceEstimator {
    fn process_frame(&mut self, _frame: &Frame) -> Option<f64> {
        self.readings.next().flatten()
    }
}
