//! Level → outputs.
//!
//! The output bank behaves like a bar graph: pin `i` of `n` switches on
//! once the level is strictly above `i * max / n` (integer division),
//! so pin 0 lights for any positive level and each following pin needs
//! proportionally more.  Each pin's polarity then decides whether "on"
//! means HIGH or LOW on the wire.  The PWM output follows the level as
//! `level * 100 / max` percent.

use super::level::ActivationLevel;
use super::ports::OutputPort;
use crate::config::DetectorConfig;
use crate::pins::PinId;

/// Threshold pin `index` (of `count`) must exceed to switch on.
pub fn pin_threshold(index: usize, count: usize, max_activation: i32) -> i32 {
    if count == 0 {
        return 0;
    }
    (index as i64 * i64::from(max_activation) / count as i64) as i32
}

/// Wire level for a pin: `active_high` pins are HIGH when on, the
/// others are HIGH when off.
pub const fn physical_state(logically_on: bool, active_high: bool) -> bool {
    logically_on == active_high
}

/// PWM duty in percent, `level * 100 / max` truncated.  Not clamped:
/// out-of-window distance levels give values outside `0..=100`.
pub fn duty_percent(level: ActivationLevel, max_activation: i32) -> i32 {
    if max_activation == 0 {
        return 0;
    }
    let duty = i64::from(level.half_steps()) * 100 / (2 * i64::from(max_activation));
    duty.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Logical on/off per output pin, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinPattern(Vec<bool>);

impl PinPattern {
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Number of pins switched on.
    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|&&on| on).count()
    }
}

/// One on/off output and its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChannel {
    pub pin: PinId,
    /// `true` = the pin is active HIGH.
    pub active_high: bool,
}

/// Expands levels into pin writes and a duty cycle.
#[derive(Debug, Clone)]
pub struct ActivationDriver {
    channels: Vec<OutputChannel>,
    pwm_pin: Option<PinId>,
    max_activation: i32,
}

impl ActivationDriver {
    pub fn new(channels: Vec<OutputChannel>, pwm_pin: Option<PinId>, max_activation: i32) -> Self {
        Self {
            channels,
            pwm_pin,
            max_activation,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        let channels = config
            .gpio
            .output_pins
            .iter()
            .zip(&config.gpio.on_states)
            .map(|(&pin, &active_high)| OutputChannel { pin, active_high })
            .collect();
        Self::new(channels, config.gpio.pwm_pin, config.max_activation())
    }

    pub fn channels(&self) -> &[OutputChannel] {
        &self.channels
    }

    pub fn max_activation(&self) -> i32 {
        self.max_activation
    }

    /// Per-pin thresholds, in configuration order.
    pub fn thresholds(&self) -> Vec<i32> {
        let n = self.channels.len();
        (0..n)
            .map(|i| pin_threshold(i, n, self.max_activation))
            .collect()
    }

    /// Logical pattern for `level`.
    pub fn pattern(&self, level: ActivationLevel) -> PinPattern {
        PinPattern(self.thresholds().into_iter().map(|t| level.exceeds(t)).collect())
    }

    /// `(pin, high)` writes for `level`, polarity applied.
    pub fn pin_states(&self, level: ActivationLevel) -> Vec<(PinId, bool)> {
        self.pattern(level)
            .as_slice()
            .iter()
            .zip(&self.channels)
            .map(|(&on, ch)| (ch.pin, physical_state(on, ch.active_high)))
            .collect()
    }

    /// Duty for `level`, or `None` when no PWM pin is fitted.
    pub fn duty(&self, level: ActivationLevel) -> Option<i32> {
        self.pwm_pin.map(|_| duty_percent(level, self.max_activation))
    }

    /// Write `level` to the outputs: every pin in order, then the PWM.
    pub fn apply(&self, level: ActivationLevel, out: &mut impl OutputPort) {
        for (pin, high) in self.pin_states(level) {
            out.set_pin_state(pin, high);
        }
        if let Some(duty) = self.duty(level) {
            out.set_duty_cycle(duty);
        }
    }
}
