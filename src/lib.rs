//! PulsePause: periodic webcam heart-rate check-ins with stress alerts.
//!
//! A tray application that asks the user, every configured interval, to sit
//! in front of the camera for a short measurement. The averaged heart rate is
//! compared against a profile threshold and an elevated reading triggers an
//! alert with a mindfulness exercise.
//!
//! # Architecture
//!
//! - **Settings**: JSON file owned by [`SettingsStore`]
//! - **Scheduler**: self-renewing tokio timer, see [`Scheduler`]
//! - **Session**: check-in state machine over the capture seam
//! - **Capture**: [`capture::Camera`] and [`capture::HeartRateEstimator`] traits
//! - **Presenter**: dialogs and preview supplied by the frontend
//! - **App**: [`PulsePause`] dispatches tray actions

pub mod app;
pub mod capture;
pub mod classifier;
pub mod error;
pub mod exercises;
pub mod presenter;
pub mod pulse_dirs;
pub mod scheduler;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_utils;

pub use app::{Flow, PulsePause, TrayAction};
pub use error::{PulseError, Result};
pub use presenter::{HeadlessPresenter, Presenter};
pub use scheduler::Scheduler;
pub use session::{CheckInOutcome, CheckInRequest, SessionResult};
pub use settings::{Settings, SettingsStore};
