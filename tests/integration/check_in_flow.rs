//! End-to-end check-ins through the tray app.

use crate::helpers::{minutes, next_result, settings, test_app};
use pulsepause::presenter::NoticeLevel;
use pulsepause::{CheckInOutcome, TrayAction};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn scheduled_high_reading_raises_alert_with_exercise() {
    let mut t = test_app(Some(settings(true, 1, false)), 110.0, true);
    t.app.start().expect("start");
    assert_eq!(t.app.scheduler().pending_interval(), Some(minutes(1)));

    tokio::time::advance(minutes(1) + Duration::from_secs(1)).await;
    let outcome = next_result(&mut t.results).await.expect("scheduled outcome");

    let result = outcome.result().expect("completed");
    assert_eq!(result.average_bpm, 110.0);
    assert!(result.anomalous);
    assert!(result.message.contains("110"));
    assert!(result.message.contains("100"));
    assert!(result.suggested_exercise.is_some());

    assert_eq!(t.presenter.prompts(), 0);
    let notices = t.presenter.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert_eq!(notices[0].title, "High Stress Alert");
    assert!(notices[0].message.contains("Suggested Exercise:"));
    assert_eq!(t.camera.opened(), 1);
    assert_eq!(t.camera.closed(), 1);

    // The timer re-armed before the check-in ran.
    assert!(t.app.scheduler().is_armed());
}

#[tokio::test(start_paused = true)]
async fn disabled_app_schedules_nothing_but_allows_manual_check_in() {
    let mut t = test_app(Some(settings(false, 1, false)), 72.0, true);
    t.app.start().expect("start");
    assert!(!t.app.scheduler().is_armed());

    tokio::time::advance(minutes(10)).await;
    assert!(next_result(&mut t.results).await.is_none());
    assert_eq!(t.camera.opened(), 0);

    let outcome = t.app.check_in(false).expect("manual check-in");

    let result = outcome.result().expect("completed");
    assert!(!result.anomalous);
    assert_eq!(t.presenter.prompts(), 1);
    assert_eq!(
        t.presenter.notices()[0].message,
        "Your heart rate is normal. Keep up the good work!"
    );
}

#[tokio::test]
async fn athlete_profile_flags_moderate_reading() {
    let t = test_app(Some(settings(true, 60, true)), 90.0, true);

    let outcome = t.app.check_in(true).expect("manual check-in");

    let result = outcome.result().expect("completed");
    assert!(result.anomalous);
    assert_eq!(result.threshold_bpm, 80.0);
}

#[tokio::test]
async fn declined_consent_shows_nothing() {
    let t = test_app(None, 110.0, false);

    let outcome = t.app.check_in(false).expect("manual check-in");

    assert!(matches!(outcome, CheckInOutcome::Skipped { .. }));
    assert!(t.presenter.notices().is_empty());
    assert_eq!(t.camera.opened(), 0);
}

#[tokio::test]
async fn exit_action_persists_and_stops() {
    let t = test_app(Some(settings(true, 5, false)), 70.0, true);
    t.app.start().expect("start");

    let flow = t.app.handle(TrayAction::Exit).expect("exit");

    assert_eq!(flow, pulsepause::Flow::Exit);
    assert!(!t.app.scheduler().is_armed());
    assert!(t.dir.path().join("settings.json").exists());
    assert_eq!(
        t.app.store().load().expect("load"),
        settings(true, 5, false)
    );
}
