//! Check-in sessions.
//!
//! A check-in walks a small state machine:
//!
//! ```text
//! Idle ─► AwaitingConsent ─► Capturing ─► Averaging ─► Reporting ─► Done
//!  │            │                │             │
//!  └────────────┼──────────────► │             └──► Done (inconclusive)
//!               ▼                ▼
//!            Skipped          Skipped (camera unavailable)
//! ```
//!
//! [`CheckInSession`] runs one pass over borrowed collaborators.
//! [`CheckInRunner`] owns the camera and estimator, allows one session at a
//! time and reports each outcome through the [`Presenter`].

use crate::capture::{Camera, HeartRateEstimator, OpenCamera, Preview};
use crate::classifier::{self, Profile};
use crate::exercises::{self, Exercise};
use crate::presenter::{PreviewControl, Presenter};
use crate::settings::Settings;
use serde::Serialize;
use std::sync::{Mutex, TryLockError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const CONSENT_TITLE: &str = "Stress Check-In";
const CONSENT_MESSAGE: &str = "Are you ready for a brief mindfulness check-in?";

/// Who started a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInTrigger {
    /// The user picked "Check In" from the tray.
    Manual,
    /// The scheduler timer fired.
    Scheduled,
}

/// Parameters of one check-in.
#[derive(Debug, Clone)]
pub struct CheckInRequest {
    /// Who started the check-in.
    pub trigger: CheckInTrigger,
    /// Go straight to capture without asking for consent.
    pub skip_permission: bool,
    /// Stops the capture loop early when cancelled.
    pub cancel: CancellationToken,
}

impl CheckInRequest {
    /// A check-in started from the tray.
    pub fn manual(skip_permission: bool) -> Self {
        Self {
            trigger: CheckInTrigger::Manual,
            skip_permission,
            cancel: CancellationToken::new(),
        }
    }

    /// A check-in started by the scheduler.
    pub fn scheduled(skip_permission: bool) -> Self {
        Self {
            trigger: CheckInTrigger::Scheduled,
            skip_permission,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to stop the capture loop.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingConsent,
    Capturing,
    Averaging,
    Reporting,
    Done,
    Skipped,
}

impl SessionState {
    /// Returns `true` if the machine may move from `self` to `next`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, AwaitingConsent)
                | (Idle, Capturing)
                | (AwaitingConsent, Capturing)
                | (AwaitingConsent, Skipped)
                | (Capturing, Averaging)
                | (Capturing, Skipped)
                | (Averaging, Reporting)
                | (Averaging, Done)
                | (Reporting, Done)
        )
    }

    /// Returns `true` for `Done` and `Skipped`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

/// Measurement outcome handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    /// Mean of all collected samples.
    pub average_bpm: f64,
    /// `true` when the average exceeds the profile threshold.
    pub anomalous: bool,
    /// Classifier message.
    pub message: String,
    /// Present only for anomalous results.
    pub suggested_exercise: Option<Exercise>,
    /// Threshold used for classification.
    pub threshold_bpm: f64,
    /// Number of samples averaged.
    pub sample_count: usize,
}

/// Why a check-in did not measure anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The user answered "no" to the consent prompt.
    ConsentDeclined,
    /// The camera could not be opened.
    CameraUnavailable(String),
    /// The app is exiting.
    ShuttingDown,
}

/// Result of a check-in request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    /// A measurement was taken and classified.
    Completed(SessionResult),
    /// Capture ran but produced no samples.
    Inconclusive,
    /// No measurement was attempted.
    Skipped { reason: SkipReason },
    /// Another check-in was already running.
    Busy,
}

impl CheckInOutcome {
    /// Returns `true` when the camera was used.
    pub fn ran(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Inconclusive)
    }

    /// The result of a completed measurement.
    pub fn result(&self) -> Option<&SessionResult> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Completed(r) => format!(
                "{:.1} bpm over {} samples ({})",
                r.average_bpm,
                r.sample_count,
                if r.anomalous { "high" } else { "normal" }
            ),
            Self::Inconclusive => "inconclusive, no samples".to_owned(),
            Self::Skipped { reason } => match reason {
                SkipReason::ConsentDeclined => "skipped, consent declined".to_owned(),
                SkipReason::CameraUnavailable(e) => format!("skipped, camera unavailable: {e}"),
                SkipReason::ShuttingDown => "skipped, shutting down".to_owned(),
            },
            Self::Busy => "skipped, another check-in is running".to_owned(),
        }
    }
}

/// One pass of the check-in state machine.
pub struct CheckInSession<'a> {
    camera: &'a mut dyn Camera,
    estimator: &'a mut dyn HeartRateEstimator,
    presenter: &'a dyn Presenter,
    profile: Profile,
    capture_duration: Duration,
    state: SessionState,
    trail: Vec<SessionState>,
}

impl<'a> CheckInSession<'a> {
    /// Prepare a session using the profile and capture window from `settings`.
    pub fn new(
        camera: &'a mut dyn Camera,
        estimator: &'a mut dyn HeartRateEstimator,
        presenter: &'a dyn Presenter,
        settings: &Settings,
    ) -> Self {
        Self {
            camera,
            estimator,
            presenter,
            profile: settings.profile(),
            capture_duration: settings.capture_duration(),
            state: SessionState::Idle,
            trail: vec![SessionState::Idle],
        }
    }

    /// Override the capture window.
    pub fn with_capture_duration(mut self, duration: Duration) -> Self {
        self.capture_duration = duration;
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn trail(&self) -> &[SessionState] {
        &self.trail
    }

    /// Run the session to a terminal state.
    ///
    /// Declined consent and a missing camera are outcomes, not errors.
    pub fn run(&mut self, request: &CheckInRequest) -> CheckInOutcome {
        if self.state != SessionState::Idle {
            self.state = SessionState::Idle;
            self.trail = vec![SessionState::Idle];
        }
        info!(trigger = ?request.trigger, "check-in started");

        if request.skip_permission {
            self.advance(SessionState::Capturing);
        } else {
            self.advance(SessionState::AwaitingConsent);
            if !self.presenter.confirm(CONSENT_TITLE, CONSENT_MESSAGE) {
                self.advance(SessionState::Skipped);
                info!("check-in declined");
                return CheckInOutcome::Skipped {
                    reason: SkipReason::ConsentDeclined,
                };
            }
            self.advance(SessionState::Capturing);
        }

        let samples = match self.capture(&request.cancel) {
            Ok(samples) => samples,
            Err(reason) => {
                self.advance(SessionState::Skipped);
                return CheckInOutcome::Skipped { reason };
            }
        };

        self.advance(SessionState::Averaging);
        let Some(average_bpm) = mean(&samples) else {
            self.advance(SessionState::Done);
            info!("check-in inconclusive, no heart-rate samples");
            return CheckInOutcome::Inconclusive;
        };

        self.advance(SessionState::Reporting);
        let verdict = classifier::classify(average_bpm, self.profile);
        let suggested_exercise = verdict
            .anomalous
            .then(|| exercises::pick(&mut rand::thread_rng()));
        self.advance(SessionState::Done);

        let result = SessionResult {
            average_bpm,
            anomalous: verdict.anomalous,
            message: verdict.message,
            suggested_exercise,
            threshold_bpm: verdict.threshold_bpm,
            sample_count: samples.len(),
        };
        info!(
            average_bpm = result.average_bpm,
            anomalous = result.anomalous,
            samples = result.sample_count,
            "check-in complete"
        );
        CheckInOutcome::Completed(result)
    }

    /// Pull frames until the window elapses, the stream ends, `cancel` fires
    /// or the user closes the preview.
    fn capture(&mut self, cancel: &CancellationToken) -> Result<Vec<f64>, SkipReason> {
        let mut camera = match OpenCamera::open(&mut *self.camera) {
            Ok(camera) => camera,
            Err(e) => {
                warn!("check-in skipped: {e}");
                return Err(SkipReason::CameraUnavailable(e.to_string()));
            }
        };
        let _preview = PreviewGuard(self.presenter);

        let deadline = Instant::now() + self.capture_duration;
        let mut samples = Vec::new();
        let mut frames = 0_usize;

        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                info!("capture cancelled");
                break;
            }
            let Some(frame) = camera.read_frame() else {
                debug!("camera stream ended after {frames} frames");
                break;
            };
            frames += 1;

            let reading = self
                .estimator
                .process_frame(&frame)
                .filter(|bpm| bpm.is_finite() && *bpm > 0.0);
            if let Some(bpm) = reading {
                samples.push(bpm);
            }

            if self.presenter.show_preview(&Preview::new(&frame, reading)) == PreviewControl::Close {
                info!("preview closed by user, ending capture");
                break;
            }
        }

        camera.close();
        debug!(frames, samples = samples.len(), "capture finished");
        Ok(samples)
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid check-in transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "check-in state");
        self.state = next;
        self.trail.push(next);
    }
}

/// Closes the preview window when capture ends, on every path.
struct PreviewGuard<'a>(&'a dyn Presenter);

impl Drop for PreviewGuard<'_> {
    fn drop(&mut self) {
        self.0.close_preview();
    }
}

/// Arithmetic mean, `None` for an empty slice.
fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Show `outcome` to the user.
///
/// A missing camera is only reported for manual check-ins; background
/// check-ins fail silently. Declined consent, shutdown and `Busy` show
/// nothing.
pub fn report_outcome(presenter: &dyn Presenter, outcome: &CheckInOutcome, trigger: CheckInTrigger) {
    match outcome {
        CheckInOutcome::Completed(result) if result.anomalous => {
            let mut message = result.message.clone();
            if let Some(exercise) = &result.suggested_exercise {
                message.push_str(&format!(
                    "\n\nSuggested Exercise: {}\n{}",
                    exercise.name, exercise.description
                ));
            }
            presenter.warn("High Stress Alert", &message);
        }
        CheckInOutcome::Completed(_) => {
            presenter.inform(
                "Stress Check-In",
                "Your heart rate is normal. Keep up the good work!",
            );
        }
        CheckInOutcome::Inconclusive => {
            presenter.inform(
                "Stress Check-In",
                "We couldn't read your heart rate this time. Make sure your face is visible to the camera and try again.",
            );
        }
        CheckInOutcome::Skipped {
            reason: SkipReason::CameraUnavailable(_),
        } if trigger == CheckInTrigger::Manual => {
            presenter.inform(
                "Stress Check-In",
                "The camera is not available right now, so the check-in was skipped.",
            );
        }
        CheckInOutcome::Skipped { .. } | CheckInOutcome::Busy => {}
    }
}

/// Capture collaborators owned by a [`CheckInRunner`].
struct CaptureDevices {
    camera: Box<dyn Camera>,
    estimator: Box<dyn HeartRateEstimator>,
}

/// Runs check-ins one at a time against a shared camera and estimator.
pub struct CheckInRunner {
    devices: Mutex<CaptureDevices>,
    presenter: std::sync::Arc<dyn Presenter>,
}

impl CheckInRunner {
    /// Create a runner owning `camera` and `estimator`.
    pub fn new(
        camera: Box<dyn Camera>,
        estimator: Box<dyn HeartRateEstimator>,
        presenter: std::sync::Arc<dyn Presenter>,
    ) -> Self {
        Self {
            devices: Mutex::new(CaptureDevices { camera, estimator }),
            presenter,
        }
    }

    /// Run one check-in and report its outcome.
    ///
    /// Blocks for the capture window. Returns [`CheckInOutcome::Busy`]
    /// without touching the camera if another check-in holds it.
    pub fn run(&self, request: &CheckInRequest, settings: &Settings) -> CheckInOutcome {
        let mut devices = match self.devices.try_lock() {
            Ok(devices) => devices,
            Err(TryLockError::WouldBlock) => {
                info!(trigger = ?request.trigger, "check-in already running, ignoring request");
                return CheckInOutcome::Busy;
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        let CaptureDevices { camera, estimator } = &mut *devices;

        let outcome = CheckInSession::new(
            camera.as_mut(),
            estimator.as_mut(),
            self.presenter.as_ref(),
            settings,
        )
        .run(request);
        drop(devices);

        report_outcome(self.presenter.as_ref(), &outcome, request.trigger);
        outcome
    }
}
