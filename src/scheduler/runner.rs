//! Scheduler timer loop.
//!
//! Each armed timer is a tokio task racing `tokio::time::sleep_until` against
//! its own cancellation token. The deadline is fixed when the timer is armed,
//! not when the task first runs. Only the most recently armed timer is live;
//! arming again cancels the previous one. Re-arming after a fire re-reads the
//! settings from the [`SettingsStore`].

use crate::error::{PulseError, Result};
use crate::session::{CheckInOutcome, CheckInRequest};
use crate::settings::{Settings, SettingsStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Callback running one scheduled check-in.
///
/// Runs on the blocking pool, so it may block for the whole capture window.
pub type CheckInExecutor = Arc<dyn Fn(CheckInRequest, Settings) -> CheckInOutcome + Send + Sync>;

/// Timer currently armed.
struct PendingTimer {
    cancel: CancellationToken,
    interval: Duration,
}

struct Inner {
    store: SettingsStore,
    executor: CheckInExecutor,
    /// Channel for sending scheduled outcomes to the frontend.
    result_tx: mpsc::UnboundedSender<CheckInOutcome>,
    pending: Mutex<Option<PendingTimer>>,
    session_active: AtomicBool,
    shutdown: CancellationToken,
    runtime: tokio::runtime::Handle,
}

/// Self-renewing check-in timer.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a scheduler on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Scheduler`] when called outside a tokio runtime.
    pub fn new(
        store: SettingsStore,
        executor: CheckInExecutor,
        result_tx: mpsc::UnboundedSender<CheckInOutcome>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PulseError::Scheduler(format!("no tokio runtime: {e}")))?;
        Ok(Self::with_runtime(store, executor, result_tx, runtime))
    }

    /// Create a scheduler spawning its timers on `runtime`.
    pub fn with_runtime(
        store: SettingsStore,
        executor: CheckInExecutor,
        result_tx: mpsc::UnboundedSender<CheckInOutcome>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                executor,
                result_tx,
                pending: Mutex::new(None),
                session_active: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                runtime,
            }),
        }
    }

    /// Arm the next check-in from the current settings.
    ///
    /// Any pending timer is cancelled first. Nothing is armed while check-ins
    /// are disabled or after [`shutdown`](Self::shutdown).
    ///
    /// # Errors
    ///
    /// Returns an error if the settings storage cannot be read or repaired.
    pub fn schedule_next(&self) -> Result<()> {
        self.inner.schedule_next().map(|_| ())
    }

    /// Re-arm immediately from `new` when the cadence changed since `old`.
    ///
    /// Later re-arms read the store, so callers should save `new` as well.
    pub fn on_settings_changed(&self, new: &Settings, old: &Settings) {
        if !new.cadence_differs(old) {
            debug!("settings changed without affecting the check-in cadence");
            return;
        }
        info!(
            enabled = new.enabled,
            interval_minutes = new.interval_minutes.get(),
            "check-in cadence changed, rescheduling"
        );
        self.inner.arm(new);
    }

    /// Cancel the pending timer and any running scheduled capture.
    ///
    /// Safe to call repeatedly. The scheduler arms nothing afterwards.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(pending) = self.inner.lock_pending().take() {
            pending.cancel.cancel();
        }
        info!("scheduler stopped");
    }

    /// Interval of the pending timer, if one is armed.
    pub fn pending_interval(&self) -> Option<Duration> {
        self.inner.lock_pending().as_ref().map(|p| p.interval)
    }

    /// Returns `true` while a timer is armed.
    pub fn is_armed(&self) -> bool {
        self.pending_interval().is_some()
    }

    /// Returns `true` while a scheduled check-in is running.
    pub fn session_active(&self) -> bool {
        self.inner.session_active.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingTimer>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn schedule_next(self: &Arc<Self>) -> Result<Settings> {
        let settings = self.store.load()?;
        self.arm(&settings);
        Ok(settings)
    }

    /// Cancel any pending timer and arm a new one from `settings`.
    fn arm(self: &Arc<Self>, settings: &Settings) {
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.cancel.cancel();
            debug!("superseded pending check-in timer");
        }

        if self.shutdown.is_cancelled() {
            debug!("scheduler is shut down, not arming");
            return;
        }
        if !settings.enabled {
            info!("check-ins disabled, no timer armed");
            return;
        }

        let interval = settings.interval();
        let deadline = tokio::time::Instant::now() + interval;
        let cancel = self.shutdown.child_token();
        *pending = Some(PendingTimer {
            cancel: cancel.clone(),
            interval,
        });
        drop(pending);

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => inner.fire().await,
            }
        });

        info!(
            "next check-in in {} minutes",
            settings.interval_minutes.get()
        );
    }

    async fn fire(self: Arc<Self>) {
        // Re-arm before running so a failing check-in cannot break the cadence.
        let rearm = {
            let inner = Arc::clone(&self);
            tokio::task::spawn_blocking(move || inner.schedule_next()).await
        };
        let settings = match rearm {
            Ok(Ok(settings)) => settings,
            Ok(Err(e)) => {
                error!("cannot re-arm check-in timer: {e}");
                return;
            }
            Err(e) => {
                error!("check-in timer re-arm panicked: {e}");
                return;
            }
        };
        if !settings.enabled {
            return;
        }
        if self.session_active.swap(true, Ordering::SeqCst) {
            warn!("previous check-in still running, skipping this one");
            return;
        }

        let request = CheckInRequest::scheduled(!settings.prompt_on_scheduled_checkin)
            .with_cancel(self.shutdown.child_token());
        let executor = Arc::clone(&self.executor);
        let joined = tokio::task::spawn_blocking(move || executor(request, settings)).await;
        self.session_active.store(false, Ordering::SeqCst);

        match joined {
            Ok(outcome) => {
                info!("scheduled check-in finished: {}", outcome.summary());
                if self.result_tx.send(outcome).is_err() {
                    debug!("scheduler result channel closed");
                }
            }
            Err(e) => error!("scheduled check-in failed: {e}"),
        }
    }
}
