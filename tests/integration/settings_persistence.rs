//! Settings file behavior as seen through the public store API.

use crate::helpers::settings;
use pulsepause::{Settings, SettingsStore};
use std::fs;

#[test]
fn first_run_writes_default_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("settings.json");
    let store = SettingsStore::new(&path);

    let loaded = store.load().expect("load");

    assert_eq!(loaded, Settings::default());
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(raw["disable_app"], false);
    assert_eq!(raw["check_in_interval"], 60);
    assert_eq!(raw["is_athlete"], false);
}

#[test]
fn saved_settings_survive_a_new_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    let saved = Settings {
        prompt_on_scheduled_checkin: true,
        ..settings(false, 45, true)
    };

    SettingsStore::new(&path).save(&saved).expect("save");
    let reloaded = SettingsStore::new(&path).load().expect("load");

    assert_eq!(reloaded, saved);
}

#[test]
fn garbage_file_is_repaired_on_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").expect("write");
    let store = SettingsStore::new(&path);

    assert_eq!(store.load().expect("load"), Settings::default());

    let repaired = fs::read_to_string(&path).expect("read");
    assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
}

#[test]
fn file_written_by_older_release_is_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{"disable_app": true, "check_in_interval": 15, "is_athlete": true}"#,
    )
    .expect("write");

    let loaded = SettingsStore::new(&path).load().expect("load");

    assert_eq!(loaded, settings(false, 15, true));
}
