//! Integration tests for loading the configuration file from disk.

use std::fs;
use std::path::PathBuf;

use proximity::config::{DetectorConfig, Mode};
use proximity::error::ConfigError;

/// Write `body` to a per-test file under the system temp dir.
fn config_file(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("proximity-{}-{name}.json", std::process::id()));
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join("proximity-does-not-exist.json");
    let config = DetectorConfig::load(&path).unwrap();
    assert_eq!(config, DetectorConfig::default());
}

#[test]
fn full_file_is_loaded_and_validated() {
    let path = config_file(
        "full",
        r#"{
            "gpio": {
                "max_activation": 6,
                "output_pins": [5, 6, 13],
                "on_states": [true, false, true],
                "pwm_pin": null
            },
            "bluetooth": {
                "target": "00:1a:7d:da:71:13",
                "min_rssi": -60,
                "max_rssi": 10,
                "timeout_secs": 4
            },
            "settings": { "mode": 2, "tick_interval_ms": 250 }
        }"#,
    );
    let config = DetectorConfig::load(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(config.gpio.max_activation, 6);
    assert_eq!(config.gpio.on_states, vec![true, false, true]);
    assert_eq!(config.gpio.pwm_pin, None);
    assert_eq!(config.bluetooth.target.to_string(), "00:1A:7D:DA:71:13");
    assert_eq!(config.settings.mode, Mode::Distance);
    assert_eq!(config.rssi_timeout().as_secs(), 4);
    assert_eq!(config.tick_interval().as_millis(), 250);
}

#[test]
fn malformed_file_is_fatal() {
    let path = config_file("malformed", r#"{ "gpio": { "max_activation": "#);
    let err = DetectorConfig::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
}

#[test]
fn invalid_file_is_fatal() {
    let path = config_file("invalid", r#"{ "bluetooth": { "min_rssi": 30, "max_rssi": 30 } }"#);
    let err = DetectorConfig::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::ValidationFailed(_)), "got {err:?}");
}

#[test]
fn unknown_mode_is_rejected() {
    let path = config_file("mode", r#"{ "settings": { "mode": "strobe" } }"#);
    let err = DetectorConfig::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
}
