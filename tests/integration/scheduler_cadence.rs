//! Scheduler cadence driven through settings changes.

use crate::helpers::{minutes, next_result, settings, test_app};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn timer_keeps_firing_at_interval() {
    let mut t = test_app(Some(settings(true, 2, false)), 70.0, true);
    t.app.start().expect("start");

    for round in 1..=3 {
        tokio::time::advance(minutes(2) + Duration::from_secs(1)).await;
        assert!(
            next_result(&mut t.results).await.is_some(),
            "round {round} should fire"
        );
    }
    assert_eq!(t.camera.opened(), 3);
}

#[tokio::test(start_paused = true)]
async fn latest_settings_change_wins() {
    let mut t = test_app(Some(settings(true, 10, false)), 70.0, true);
    t.app.start().expect("start");

    let ten = settings(true, 10, false);
    let thirty = settings(true, 30, false);
    let three = settings(true, 3, false);
    t.app.save_settings(thirty, &ten).expect("save 30");
    t.app.save_settings(three, &thirty).expect("save 3");

    assert_eq!(t.app.scheduler().pending_interval(), Some(minutes(3)));

    tokio::time::advance(minutes(3) + Duration::from_secs(1)).await;
    assert!(next_result(&mut t.results).await.is_some());
    assert_eq!(t.camera.opened(), 1);

    assert_eq!(t.app.scheduler().pending_interval(), Some(minutes(3)));

    tokio::time::advance(minutes(2)).await;
    assert!(next_result(&mut t.results).await.is_none());
    assert_eq!(t.camera.opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabling_stops_pending_check_in() {
    let mut t = test_app(Some(settings(true, 5, false)), 70.0, true);
    t.app.start().expect("start");

    let enabled = settings(true, 5, false);
    let disabled = settings(false, 5, false);
    t.app.save_settings(disabled, &enabled).expect("disable");

    assert!(!t.app.scheduler().is_armed());
    tokio::time::advance(minutes(30)).await;
    assert!(next_result(&mut t.results).await.is_none());
    assert_eq!(t.camera.opened(), 0);
}
