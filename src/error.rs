//! Error types for PulsePause.

/// Top-level error type for the check-in core.
///
/// Expected conditions of a check-in (declined consent, missing camera,
/// empty measurement) are outcomes, not errors; see
/// [`CheckInOutcome`](crate::session::CheckInOutcome).
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    /// Settings persistence error (serialization, unwritable storage).
    #[error("settings error: {0}")]
    Settings(String),

    /// Scheduler error (timer arming, runtime unavailable).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PulseError>;
