//! GPIO adapter: relay bank + PWM output behind [`OutputPort`].
//!
//! [`PinBank`] is generic over the `embedded-hal` 1.0 output traits, so
//! the same code drives real Raspberry Pi pins (via `rppal`, behind the
//! `rpi` feature) and the recording mocks used in tests.
//!
//! ## Dual-target design
//!
//! On the Pi: [`PinBank::open`] claims every configured pin through
//! `rppal` and starts software PWM.
//! On host/test: build a bank from any `OutputPin` / `SetDutyCycle`.
//!
//! Each relay keeps its polarity, so "off" is LOW for an active-high
//! relay and HIGH for an active-low one, both at claim time and on
//! [`release_all`](OutputPort::release_all).

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::activation::{OutputChannel, physical_state};
use crate::app::ports::OutputPort;
use crate::pins::PinId;

/// Relay outputs plus an optional PWM channel.
pub struct PinBank<P, W> {
    relays: Vec<(OutputChannel, P)>,
    pwm: Option<W>,
    duty: u8,
}

impl<P: OutputPin, W: SetDutyCycle> PinBank<P, W> {
    pub fn new(relays: Vec<(OutputChannel, P)>, pwm: Option<W>) -> Self {
        Self {
            relays,
            pwm,
            duty: 0,
        }
    }

    /// Duty last handed to the PWM channel, after saturation.
    pub fn duty(&self) -> u8 {
        self.duty
    }

    fn write_pin(pin: PinId, out: &mut P, high: bool) {
        let result = if high { out.set_high() } else { out.set_low() };
        if let Err(e) = result {
            warn!("GPIO {}: write failed: {:?}", pin, e);
        }
    }
}

/// Saturate a computed duty to the range the PWM hardware accepts.
fn saturate_duty(percent: i32) -> u8 {
    percent.clamp(0, 100) as u8
}

impl<P: OutputPin, W: SetDutyCycle> OutputPort for PinBank<P, W> {
    fn set_pin_state(&mut self, pin: PinId, high: bool) {
        match self.relays.iter_mut().find(|(ch, _)| ch.pin == pin) {
            Some((ch, out)) => Self::write_pin(ch.pin, out, high),
            None => warn!("GPIO {}: not an output of this bank", pin),
        }
    }

    fn set_duty_cycle(&mut self, percent: i32) {
        let Some(pwm) = self.pwm.as_mut() else {
            return;
        };
        let duty = saturate_duty(percent);
        if i32::from(duty) != percent {
            warn!("PWM duty {}% out of range, using {}%", percent, duty);
        }
        match pwm.set_duty_cycle_percent(duty) {
            Ok(()) => self.duty = duty,
            Err(e) => warn!("PWM: duty update failed: {:?}", e),
        }
    }

    fn release_all(&mut self) {
        self.set_duty_cycle(0);
        for (ch, out) in &mut self.relays {
            Self::write_pin(ch.pin, out, physical_state(false, ch.active_high));
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Raspberry Pi pins (rppal)
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "rpi")]
pub use rpi::{PwmError, RelayPin, RpiPinBank, SoftPwm};

#[cfg(feature = "rpi")]
mod rpi {
    use core::convert::Infallible;

    use embedded_hal::{digital, pwm};
    use log::info;
    use rppal::gpio::Gpio;

    use super::PinBank;
    use crate::app::activation::{OutputChannel, physical_state};
    use crate::config::DetectorConfig;
    use crate::error::HwInitError;

    /// A BCM pin claimed as a push-pull output.
    pub struct RelayPin(rppal::gpio::OutputPin);

    impl digital::ErrorType for RelayPin {
        type Error = Infallible;
    }

    impl digital::OutputPin for RelayPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.set_low();
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.set_high();
            Ok(())
        }
    }

    #[derive(Debug)]
    pub struct PwmError(rppal::gpio::Error);

    impl pwm::Error for PwmError {
        fn kind(&self) -> pwm::ErrorKind {
            pwm::ErrorKind::Other
        }
    }

    /// Software PWM on an ordinary GPIO, fixed frequency.
    pub struct SoftPwm {
        pin: rppal::gpio::OutputPin,
        frequency_hz: f64,
    }

    impl pwm::ErrorType for SoftPwm {
        type Error = PwmError;
    }

    impl pwm::SetDutyCycle for SoftPwm {
        fn max_duty_cycle(&self) -> u16 {
            100
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), PwmError> {
            let fraction = f64::from(duty.min(100)) / 100.0;
            self.pin
                .set_pwm_frequency(self.frequency_hz, fraction)
                .map_err(PwmError)
        }
    }

    impl Drop for SoftPwm {
        fn drop(&mut self) {
            let _ = self.pin.clear_pwm();
        }
    }

    pub type RpiPinBank = PinBank<RelayPin, SoftPwm>;

    impl RpiPinBank {
        /// Claim every configured output in its off state and start PWM at 0%.
        pub fn open(config: &DetectorConfig) -> Result<Self, HwInitError> {
            let gpio = Gpio::new().map_err(|e| HwInitError::GpioUnavailable(e.to_string()))?;

            let claim = |pin: u8, high: bool| {
                gpio.get(pin)
                    .map(|p| if high { p.into_output_high() } else { p.into_output_low() })
                    .map_err(|e| HwInitError::PinClaimFailed {
                        pin,
                        reason: e.to_string(),
                    })
            };

            let mut relays = Vec::with_capacity(config.gpio.output_pins.len());
            let polarity = config.gpio.output_pins.iter().zip(&config.gpio.on_states);
            for (&pin, &active_high) in polarity {
                let out = claim(pin, physical_state(false, active_high))?;
                relays.push((OutputChannel { pin, active_high }, RelayPin(out)));
            }

            let pwm = match config.gpio.pwm_pin {
                Some(pin) => {
                    let mut soft = SoftPwm {
                        pin: claim(pin, false)?,
                        frequency_hz: f64::from(config.gpio.pwm_frequency_hz),
                    };
                    pwm::SetDutyCycle::set_duty_cycle(&mut soft, 0)
                        .map_err(|e| HwInitError::PwmStartFailed(e.0.to_string()))?;
                    Some(soft)
                }
                None => None,
            };

            info!(
                "GPIO ready: outputs={:?} pwm={:?} @ {}Hz",
                config.gpio.output_pins, config.gpio.pwm_pin, config.gpio.pwm_frequency_hz
            );
            Ok(PinBank::new(relays, pwm))
        }
    }
}
