//! Error types for the proximity detector.
//!
//! The core (level mapping, activation, control loop) is total and never
//! fails.  Errors only exist at the edges: loading the configuration and
//! bringing up hardware.  Both are fatal at startup.

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while reading or validating the configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Io(std::io::Error),
    /// The file is not valid JSON or has the wrong shape.
    Parse(serde_json::Error),
    /// A field failed range or consistency validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The Bluetooth target is not a `XX:XX:XX:XX:XX:XX` address.
    InvalidAddress(String),
    /// Unknown operating mode name or code.
    UnknownMode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read config: {e}"),
            Self::Parse(e) => write!(f, "malformed config: {e}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::InvalidAddress(addr) => write!(f, "invalid Bluetooth address '{addr}'"),
            Self::UnknownMode(mode) => {
                write!(f, "unknown mode '{mode}' (expected demo|flicker|distance or 0|1|2)")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware bring-up errors
// ---------------------------------------------------------------------------

/// Errors during one-shot peripheral initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwInitError {
    /// The GPIO peripheral could not be opened (not a Pi, no permission).
    GpioUnavailable(String),
    /// A single pin could not be claimed as an output.
    PinClaimFailed { pin: u8, reason: String },
    /// Software PWM could not be started on the PWM pin.
    PwmStartFailed(String),
}

impl fmt::Display for HwInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioUnavailable(reason) => write!(f, "GPIO unavailable: {reason}"),
            Self::PinClaimFailed { pin, reason } => {
                write!(f, "cannot claim GPIO {pin} as output: {reason}")
            }
            Self::PwmStartFailed(reason) => write!(f, "PWM start failed: {reason}"),
        }
    }
}

impl std::error::Error for HwInitError {}
