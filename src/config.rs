//! Detector configuration.
//!
//! Loaded once at startup from a JSON file with three sections that
//! mirror the relay board's wiring sheet:
//!
//! ```json
//! {
//!   "gpio":      { "max_activation": 10, "output_pins": [15, 17, 18],
//!                  "on_states": [true, true, true], "pwm_pin": 14 },
//!   "bluetooth": { "target": "00:1A:7D:DA:71:13", "min_rssi": -100, "max_rssi": 25 },
//!   "settings":  { "mode": "distance" }
//! }
//! ```
//!
//! Every field is optional and falls back to [`Default`].  The core
//! never sees an unvalidated config: [`DetectorConfig::load`] and
//! [`DetectorConfig::from_json_str`] both run [`DetectorConfig::validate`].

use core::fmt;
use core::str::FromStr;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::address::BdAddr;
use crate::error::ConfigError;
use crate::pins::{self, PinId};

/// Signal source driving the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ModeRepr", rename_all = "lowercase")]
pub enum Mode {
    /// Fixed ramp through every level.
    #[default]
    Demo,
    /// Weighted random flashes.
    Flicker,
    /// Proximity of the Bluetooth target.
    Distance,
}

/// Accepts both the mode name and the legacy integer code.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<ModeRepr> for Mode {
    type Error = ConfigError;

    fn try_from(repr: ModeRepr) -> Result<Self, Self::Error> {
        match repr {
            ModeRepr::Code(code) => code.to_string().parse(),
            ModeRepr::Name(name) => name.parse(),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" | "0" => Ok(Self::Demo),
            "flicker" | "1" => Ok(Self::Flicker),
            "distance" | "2" => Ok(Self::Distance),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Demo => "demo",
            Self::Flicker => "flicker",
            Self::Distance => "distance",
        })
    }
}

/// Output wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    /// Highest activation level.
    pub max_activation: u32,
    /// On/off outputs, lowest threshold first.
    pub output_pins: Vec<PinId>,
    /// Polarity per output: `true` = active HIGH.
    pub on_states: Vec<bool>,
    /// Software-PWM output, if fitted.
    pub pwm_pin: Option<PinId>,
    pub pwm_frequency_hz: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            max_activation: 10,
            output_pins: pins::DEFAULT_OUTPUT_PINS.to_vec(),
            on_states: pins::DEFAULT_ON_STATES.to_vec(),
            pwm_pin: Some(pins::DEFAULT_PWM_PIN),
            pwm_frequency_hz: pins::DEFAULT_PWM_FREQ_HZ,
        }
    }
}

/// Tracked peer and the RSSI window mapped onto the activation range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BluetoothConfig {
    pub target: BdAddr,
    /// RSSI mapped to level 0.
    pub min_rssi: i32,
    /// RSSI mapped to `max_activation`.
    pub max_rssi: i32,
    /// Upper bound on one connect + RSSI read.
    pub timeout_secs: u32,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            target: BdAddr::default(),
            min_rssi: -100,
            max_rssi: 25,
            timeout_secs: 10,
        }
    }
}

/// Loop behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub mode: Mode,
    /// Control loop cadence (milliseconds).
    pub tick_interval_ms: u32,
    /// Clamp distance-derived levels to `0..=max_activation`.
    /// Off by default: readings outside `min_rssi..=max_rssi` pass through.
    pub clamp_distance_level: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Demo,
            tick_interval_ms: 500,
            clamp_distance_level: false,
        }
    }
}

/// Complete detector configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub gpio: GpioConfig,
    pub bluetooth: BluetoothConfig,
    pub settings: Settings,
}

impl DetectorConfig {
    /// Load from `path`.
    ///
    /// A missing file is not an error: the defaults are used and a
    /// warning is logged.  Anything else that goes wrong is fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config {} not found, using defaults", path.display());
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gpio = &self.gpio;
        if gpio.max_activation == 0 {
            return Err(ConfigError::ValidationFailed("max_activation must be > 0"));
        }
        if i32::try_from(gpio.max_activation).is_err() {
            return Err(ConfigError::ValidationFailed("max_activation is too large"));
        }
        if gpio.output_pins.len() != gpio.on_states.len() {
            return Err(ConfigError::ValidationFailed(
                "output_pins and on_states must have the same length",
            ));
        }
        let all_pins = gpio.output_pins.iter().chain(gpio.pwm_pin.iter());
        if all_pins.clone().any(|&p| p > pins::MAX_BCM_PIN) {
            return Err(ConfigError::ValidationFailed("pin numbers must be BCM 0..=27"));
        }
        let mut seen = [false; pins::MAX_BCM_PIN as usize + 1];
        for &p in all_pins {
            if core::mem::replace(&mut seen[p as usize], true) {
                return Err(ConfigError::ValidationFailed("a pin is assigned more than once"));
            }
        }
        if gpio.pwm_pin.is_some() && gpio.pwm_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("pwm_frequency_hz must be > 0"));
        }

        let bt = &self.bluetooth;
        if bt.min_rssi >= bt.max_rssi {
            return Err(ConfigError::ValidationFailed("min_rssi must be below max_rssi"));
        }
        if bt.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("timeout_secs must be > 0"));
        }

        if self.settings.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        Ok(())
    }

    /// `max_activation` as the signed type the level arithmetic uses.
    /// Fits by construction once [`validate`](Self::validate) has passed.
    pub fn max_activation(&self) -> i32 {
        self.gpio.max_activation as i32
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.settings.tick_interval_ms))
    }

    pub fn rssi_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.bluetooth.timeout_secs))
    }
}
