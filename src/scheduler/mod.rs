//! Check-in scheduler.
//!
//! Arms a one-shot timer for the configured interval. When it fires, the
//! timer re-arms itself and then runs a scheduled check-in, so the cadence
//! survives a check-in that fails or panics.

pub mod runner;

pub use runner::{CheckInExecutor, Scheduler};
