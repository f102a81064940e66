//! Shared helpers for integration tests.

use pulsepause::capture::synthetic::{CameraStats, ConstantEstimator, SyntheticCamera};
use pulsepause::presenter::{Notice, NoticeLevel, Presenter};
use pulsepause::{CheckInOutcome, PulsePause, Settings, SettingsStore};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Presenter with a fixed consent answer that records prompts and notices.
#[derive(Debug, Default)]
pub(crate) struct RecordingPresenter {
    consent: bool,
    prompts: AtomicUsize,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingPresenter {
    pub(crate) fn new(consent: bool) -> Self {
        Self {
            consent,
            ..Self::default()
        }
    }

    pub(crate) fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    fn record(&self, level: NoticeLevel, title: &str, message: &str) {
        self.notices.lock().unwrap().push(Notice {
            level,
            title: title.to_owned(),
            message: message.to_owned(),
        });
    }
}

impl Presenter for RecordingPresenter {
    fn confirm(&self, _title: &str, _message: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.consent
    }

    fn inform(&self, title: &str, message: &str) {
        self.record(NoticeLevel::Info, title, message);
    }

    fn warn(&self, title: &str, message: &str) {
        self.record(NoticeLevel::Warning, title, message);
    }
}

/// `Settings` with the given cadence and profile.
pub(crate) fn settings(enabled: bool, minutes: u32, is_athlete: bool) -> Settings {
    Settings {
        enabled,
        interval_minutes: NonZeroU32::new(minutes).expect("non-zero interval"),
        is_athlete,
        ..Settings::default()
    }
}

pub(crate) fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// An app over a temp settings file, a finite synthetic camera and a
/// constant estimator.
pub(crate) struct TestApp {
    pub app: PulsePause,
    pub presenter: Arc<RecordingPresenter>,
    pub camera: CameraStats,
    pub results: mpsc::UnboundedReceiver<CheckInOutcome>,
    pub dir: tempfile::TempDir,
}

/// Build a [`TestApp`]. `initial` is saved before the app is created.
/// Must be called inside a tokio runtime.
pub(crate) fn test_app(initial: Option<Settings>, bpm: f64, consent: bool) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::new(dir.path().join("settings.json"));
    if let Some(initial) = initial {
        store.save(&initial).expect("seed settings");
    }
    let camera = CameraStats::default();
    let presenter = Arc::new(RecordingPresenter::new(consent));
    let (tx, results) = mpsc::unbounded_channel();
    let app = PulsePause::new(
        store,
        Box::new(
            SyntheticCamera::new()
                .with_frame_limit(20)
                .with_stats(camera.clone()),
        ),
        Box::new(ConstantEstimator::new(bpm)),
        presenter.clone(),
        tx,
    )
    .expect("build app");
    TestApp {
        app,
        presenter,
        camera,
        results,
        dir,
    }
}

/// Wait briefly for the next scheduled outcome.
pub(crate) async fn next_result(
    rx: &mut mpsc::UnboundedReceiver<CheckInOutcome>,
) -> Option<CheckInOutcome> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .ok()
        .flatten()
}
