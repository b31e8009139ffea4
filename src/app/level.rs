//! Activation levels and the rules that produce them.
//!
//! Every mode ends up here: the demo ramp, the flicker table and the
//! RSSI scaling are pure functions over their raw inputs.  Levels are
//! kept in half steps so the demo ramp's `0.5` increments compare
//! exactly against the integer pin thresholds downstream.

use core::fmt;

use crate::config::DetectorConfig;

/// Demand signal driving the outputs.
///
/// Stored as a count of half steps: `ActivationLevel::from_whole(3)`
/// and `ActivationLevel::from_half_steps(6)` are the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ActivationLevel {
    half_steps: i32,
}

impl ActivationLevel {
    pub const ZERO: Self = Self { half_steps: 0 };

    pub const fn from_whole(level: i32) -> Self {
        Self {
            half_steps: level.saturating_mul(2),
        }
    }

    pub const fn from_half_steps(half_steps: i32) -> Self {
        Self { half_steps }
    }

    pub const fn half_steps(self) -> i32 {
        self.half_steps
    }

    /// `true` when the level sits on a whole number.
    pub const fn is_whole(self) -> bool {
        self.half_steps % 2 == 0
    }

    /// Strictly above the integer `threshold`.
    pub fn exceeds(self, threshold: i32) -> bool {
        i64::from(self.half_steps) > 2 * i64::from(threshold)
    }

    /// Clamp into `0..=max`.
    pub fn clamp_to(self, max: i32) -> Self {
        Self {
            half_steps: self.half_steps.clamp(0, max.saturating_mul(2)),
        }
    }
}

impl fmt::Display for ActivationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.half_steps / 2;
        if self.is_whole() {
            write!(f, "{whole}")
        } else if self.half_steps < 0 && whole == 0 {
            f.write_str("-0.5")
        } else {
            write!(f, "{whole}.5")
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Demo ramp
// ───────────────────────────────────────────────────────────────

/// Ramp position that climbs by half a level per tick.
///
/// [`advance`](Self::advance) hands out the current value and then advances;
/// once the value passes `max` it restarts at zero, so one cycle is
/// `0, 0.5, …, max` (`2 * max + 1` values).
#[derive(Debug, Clone)]
pub struct DemoCounter {
    value: ActivationLevel,
    max: i32,
}

impl DemoCounter {
    pub fn new(max_activation: i32) -> Self {
        Self {
            value: ActivationLevel::ZERO,
            max: max_activation,
        }
    }

    /// Current value, without advancing.
    pub fn value(&self) -> ActivationLevel {
        self.value
    }

    pub fn advance(&mut self) -> ActivationLevel {
        let out = self.value;
        let advanced = ActivationLevel::from_half_steps(self.value.half_steps() + 1);
        self.value = if advanced.exceeds(self.max) {
            ActivationLevel::ZERO
        } else {
            advanced
        };
        out
    }
}

// ───────────────────────────────────────────────────────────────
// Flicker table
// ───────────────────────────────────────────────────────────────

/// Largest value of the flicker draw; draws are uniform over `0..=FLICKER_DRAW_MAX`.
pub const FLICKER_DRAW_MAX: u16 = 500;

/// Draws at or above this flash level 1 (10 of 501 outcomes).
const FLICKER_LEVEL_ONE_FROM: u16 = 490;

/// Map one uniform draw in `0..=500` to a flicker level.
///
/// | draw        | level | probability |
/// |-------------|-------|-------------|
/// | `500`       | 2     | 1 / 501     |
/// | `490..=499` | 1     | 10 / 501    |
/// | otherwise   | 0     | 490 / 501   |
pub fn flicker_level(draw: u16) -> ActivationLevel {
    match draw {
        FLICKER_DRAW_MAX => ActivationLevel::from_whole(2),
        d if d >= FLICKER_LEVEL_ONE_FROM => ActivationLevel::from_whole(1),
        _ => ActivationLevel::ZERO,
    }
}

// ───────────────────────────────────────────────────────────────
// RSSI scaling
// ───────────────────────────────────────────────────────────────

/// RSSI window mapped linearly onto `0..=max_activation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RssiRange {
    pub min: i32,
    pub max: i32,
}

/// Map an RSSI reading to a level.
///
/// `None` (no reading) is level 0.  Readings are floored at 0 before
/// scaling, the scaled value truncates toward zero, and the result is
/// only bounded to `0..=max_activation` when `clamp` is set.
pub fn distance_level(
    rssi: Option<i32>,
    range: RssiRange,
    max_activation: i32,
    clamp: bool,
) -> ActivationLevel {
    let Some(rssi) = rssi else {
        return ActivationLevel::ZERO;
    };
    let rssi = i64::from(rssi.max(0));
    let span = i64::from(range.max) - i64::from(range.min);
    if span <= 0 {
        return ActivationLevel::ZERO;
    }
    let scaled = i64::from(max_activation) * (rssi - i64::from(range.min)) / span;
    let scaled = scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    let level = ActivationLevel::from_whole(scaled);
    if clamp { level.clamp_to(max_activation) } else { level }
}

// ───────────────────────────────────────────────────────────────
// Mapper
// ───────────────────────────────────────────────────────────────

/// Raw sample from a signal source, before mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Current demo ramp position.
    Ramp(ActivationLevel),
    /// Uniform draw in `0..=FLICKER_DRAW_MAX`.
    Draw(u16),
    /// RSSI of the tracked peer, `None` when the query failed.
    Rssi(Option<i8>),
}

/// Turns any [`Reading`] into a level using the configured scaling.
#[derive(Debug, Clone, Copy)]
pub struct LevelMapper {
    max_activation: i32,
    range: RssiRange,
    clamp_distance: bool,
}

impl LevelMapper {
    pub fn new(max_activation: i32, range: RssiRange, clamp_distance: bool) -> Self {
        Self {
            max_activation,
            range,
            clamp_distance,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            config.max_activation(),
            RssiRange {
                min: config.bluetooth.min_rssi,
                max: config.bluetooth.max_rssi,
            },
            config.settings.clamp_distance_level,
        )
    }

    pub fn map(&self, reading: Reading) -> ActivationLevel {
        match reading {
            Reading::Ramp(level) => level,
            Reading::Draw(draw) => flicker_level(draw),
            Reading::Rssi(rssi) => distance_level(
                rssi.map(i32::from),
                self.range,
                self.max_activation,
                self.clamp_distance,
            ),
        }
    }
}
