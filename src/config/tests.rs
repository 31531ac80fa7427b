//! Tests for settings loading, saving, and validation

use super::settings::Settings;
use std::time::Duration;

#[test]
fn default_settings_are_valid() {
    let settings = Settings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(settings.await_max_attempts, 50);
    assert_eq!(settings.await_interval_ms, 500);
    // Total wait budget stays at the documented 25 seconds
    let budget = Duration::from_millis(settings.await_interval_ms)
        * settings.await_max_attempts;
    assert_eq!(budget, Duration::from_secs(25));
}

#[test]
fn load_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("does-not-exist.json");
    let settings = Settings::load(&path).expect("Load should not fail on a missing file");
    assert_eq!(settings.await_max_attempts, Settings::default().await_max_attempts);
}

#[test]
fn save_and_reload_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("config.json");

    let mut settings = Settings::default();
    settings.await_max_attempts = 3;
    settings.await_interval_ms = 10;
    settings.save(&path).expect("Save failed");

    let reloaded = Settings::load(&path).expect("Reload failed");
    assert_eq!(reloaded.await_max_attempts, 3);
    assert_eq!(reloaded.await_interval_ms, 10);
    assert_eq!(reloaded.cache_dir, settings.cache_dir);
}

#[test]
fn partial_config_uses_field_defaults() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"await_max_attempts": 7}"#).expect("Write failed");

    let settings = Settings::load(&path).expect("Load failed");
    assert_eq!(settings.await_max_attempts, 7);
    assert_eq!(settings.await_interval_ms, 500);
}

#[test]
fn validation_rejects_zero_attempts() {
    let mut settings = Settings::default();
    settings.await_max_attempts = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn validation_rejects_inverted_reconnect_delays() {
    let mut settings = Settings::default();
    settings.reconnect_base_delay_ms = 10_000;
    settings.reconnect_delay_cap_ms = 1_000;
    assert!(settings.validate().is_err());
}
