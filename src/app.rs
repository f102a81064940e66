//! Tray application.
//!
//! [`PulsePause`] ties the settings store, the scheduler and the check-in
//! runner together and maps tray menu actions onto them. Its methods block
//! for the length of a check-in or a settings dialog, so async callers should
//! run them on the blocking pool.

use crate::capture::{Camera, HeartRateEstimator};
use crate::error::Result;
use crate::presenter::Presenter;
use crate::scheduler::{CheckInExecutor, Scheduler};
use crate::session::{CheckInOutcome, CheckInRequest, CheckInRunner, SkipReason};
use crate::settings::{Settings, SettingsStore};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Tray menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    /// "Check In": start a check-in now.
    CheckIn,
    /// "Settings": open the settings editor.
    Settings,
    /// "Exit": stop everything and quit.
    Exit,
}

/// Returned when a string names no tray action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tray action `{0}` (expected check-in, settings or exit)")]
pub struct UnknownAction(pub String);

impl FromStr for TrayAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "check-in" | "checkin" | "check in" => Ok(Self::CheckIn),
            "settings" => Ok(Self::Settings),
            "exit" | "quit" => Ok(Self::Exit),
            other => Err(UnknownAction(other.to_owned())),
        }
    }
}

/// Whether the event loop keeps running after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The tray application.
pub struct PulsePause {
    store: SettingsStore,
    scheduler: Scheduler,
    runner: Arc<CheckInRunner>,
    presenter: Arc<dyn Presenter>,
    /// Parent of every manual check-in's cancel token.
    cancel: CancellationToken,
}

impl PulsePause {
    /// Build the app. Must be called inside a tokio runtime.
    ///
    /// Scheduled outcomes are sent on `result_tx`.
    ///
    /// # Errors
    ///
    /// Returns an error when no tokio runtime is available.
    pub fn new(
        store: SettingsStore,
        camera: Box<dyn Camera>,
        estimator: Box<dyn HeartRateEstimator>,
        presenter: Arc<dyn Presenter>,
        result_tx: mpsc::UnboundedSender<CheckInOutcome>,
    ) -> Result<Self> {
        let runner = Arc::new(CheckInRunner::new(camera, estimator, Arc::clone(&presenter)));
        let executor: CheckInExecutor = {
            let runner = Arc::clone(&runner);
            Arc::new(move |request: CheckInRequest, settings: Settings| {
                runner.run(&request, &settings)
            })
        };
        let scheduler = Scheduler::new(store.clone(), executor, result_tx)?;
        Ok(Self {
            store,
            scheduler,
            runner,
            presenter,
            cancel: CancellationToken::new(),
        })
    }

    /// Load settings, writing defaults on first run, and arm the first
    /// scheduled check-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings storage is unusable.
    pub fn start(&self) -> Result<Settings> {
        let settings = self.store.load()?;
        self.scheduler.schedule_next()?;
        info!(
            enabled = settings.enabled,
            interval_minutes = settings.interval_minutes.get(),
            settings_path = %self.store.path().display(),
            "pulsepause started"
        );
        Ok(settings)
    }

    /// Dispatch one tray action.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be read or written.
    pub fn handle(&self, action: TrayAction) -> Result<Flow> {
        match action {
            TrayAction::CheckIn => {
                self.check_in(true)?;
                Ok(Flow::Continue)
            }
            TrayAction::Settings => {
                self.open_settings()?;
                Ok(Flow::Continue)
            }
            TrayAction::Exit => {
                self.exit()?;
                Ok(Flow::Exit)
            }
        }
    }

    /// Run a manual check-in now, regardless of `enabled`.
    ///
    /// The scheduled timer is left as it is. After [`exit`](Self::exit) the
    /// camera is not touched and the check-in is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings storage is unusable.
    pub fn check_in(&self, skip_permission: bool) -> Result<CheckInOutcome> {
        if self.cancel.is_cancelled() {
            info!("exiting, manual check-in ignored");
            return Ok(CheckInOutcome::Skipped {
                reason: SkipReason::ShuttingDown,
            });
        }
        let settings = self.store.load()?;
        let request = CheckInRequest::manual(skip_permission).with_cancel(self.cancel.child_token());
        let outcome = self.runner.run(&request, &settings);
        info!("manual check-in finished: {}", outcome.summary());
        Ok(outcome)
    }

    /// Show the settings editor and apply the result.
    ///
    /// Returns the saved settings, or `None` when the editor was dismissed.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be read or saved.
    pub fn open_settings(&self) -> Result<Option<Settings>> {
        let current = self.store.load()?;
        let Some(edited) = self.presenter.edit_settings(&current) else {
            info!("settings editor dismissed");
            return Ok(None);
        };
        self.save_settings(edited, &current)?;
        self.presenter
            .inform("PulsePause", "Your settings have been saved.");
        Ok(Some(edited))
    }

    /// Persist `new` and reschedule if the cadence changed from `old`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be saved.
    pub fn save_settings(&self, new: Settings, old: &Settings) -> Result<()> {
        self.store.save(&new)?;
        info!(
            enabled = new.enabled,
            interval_minutes = new.interval_minutes.get(),
            is_athlete = new.is_athlete,
            "settings saved"
        );
        self.scheduler.on_settings_changed(&new, old);
        Ok(())
    }

    /// Persist settings, cancel any running capture and stop the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be persisted. The scheduler is
    /// stopped either way.
    pub fn exit(&self) -> Result<()> {
        self.cancel.cancel();
        self.scheduler.shutdown();
        let settings = self.store.load()?;
        self.store.save(&settings)?;
        info!("pulsepause exiting");
        Ok(())
    }

    /// The scheduler driving background check-ins.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The settings store.
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }
}
