//! Signal sources, one per operating mode.
//!
//! A source produces the raw [`Reading`] for its mode; the
//! [`LevelMapper`](super::level::LevelMapper) turns it into a level.
//! Only the configured source is built, and it is the sole owner of any
//! per-mode state (the demo ramp position).

use std::time::Duration;

use log::debug;
use rand::Rng;

use super::level::{DemoCounter, FLICKER_DRAW_MAX, Reading};
use super::ports::RssiPort;
use crate::address::BdAddr;
use crate::config::{DetectorConfig, Mode};

/// Produces one raw reading per tick.
pub trait SignalSource {
    /// Mode this source implements.
    fn mode(&self) -> Mode;

    /// Take the reading for this tick.  May block (distance mode).
    fn sample(&mut self) -> Reading;
}

// ───────────────────────────────────────────────────────────────
// Demo
// ───────────────────────────────────────────────────────────────

/// Ramps through every level in half steps, then starts over.
#[derive(Debug, Clone)]
pub struct DemoSource {
    counter: DemoCounter,
}

impl DemoSource {
    pub fn new(max_activation: i32) -> Self {
        Self {
            counter: DemoCounter::new(max_activation),
        }
    }
}

impl SignalSource for DemoSource {
    fn mode(&self) -> Mode {
        Mode::Demo
    }

    fn sample(&mut self) -> Reading {
        Reading::Ramp(self.counter.advance())
    }
}

// ───────────────────────────────────────────────────────────────
// Flicker
// ───────────────────────────────────────────────────────────────

/// Independent uniform draw every tick.
#[derive(Debug, Clone)]
pub struct FlickerSource<R> {
    rng: R,
}

impl<R: Rng> FlickerSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SignalSource for FlickerSource<R> {
    fn mode(&self) -> Mode {
        Mode::Flicker
    }

    fn sample(&mut self) -> Reading {
        Reading::Draw(self.rng.gen_range(0..=FLICKER_DRAW_MAX))
    }
}

// ───────────────────────────────────────────────────────────────
// Distance
// ───────────────────────────────────────────────────────────────

/// Queries the target's RSSI once per tick.
///
/// The query blocks for up to `timeout`; a failed query is just a
/// missing reading for this tick and is not retried.
pub struct DistanceSource<B> {
    reader: B,
    target: BdAddr,
    timeout: Duration,
}

impl<B: RssiPort> DistanceSource<B> {
    pub fn new(reader: B, target: BdAddr, timeout: Duration) -> Self {
        Self {
            reader,
            target,
            timeout,
        }
    }
}

impl<B: RssiPort> SignalSource for DistanceSource<B> {
    fn mode(&self) -> Mode {
        Mode::Distance
    }

    fn sample(&mut self) -> Reading {
        let rssi = self.reader.query_rssi(&self.target, self.timeout);
        debug!("RSSI {} -> {:?}", self.target, rssi);
        Reading::Rssi(rssi)
    }
}

// ───────────────────────────────────────────────────────────────
// Mode selection
// ───────────────────────────────────────────────────────────────

/// The source for the configured mode.
pub enum ModeSource<B, R> {
    Demo(DemoSource),
    Flicker(FlickerSource<R>),
    Distance(DistanceSource<B>),
}

impl<B: RssiPort, R: Rng> ModeSource<B, R> {
    /// Build the source for `config.settings.mode`.
    ///
    /// The RSSI reader and the RNG are only consumed by the mode that
    /// needs them.
    pub fn from_config(config: &DetectorConfig, reader: B, rng: R) -> Self {
        match config.settings.mode {
            Mode::Demo => Self::Demo(DemoSource::new(config.max_activation())),
            Mode::Flicker => Self::Flicker(FlickerSource::new(rng)),
            Mode::Distance => Self::Distance(DistanceSource::new(
                reader,
                config.bluetooth.target,
                config.rssi_timeout(),
            )),
        }
    }
}

impl<B: RssiPort, R: Rng> SignalSource for ModeSource<B, R> {
    fn mode(&self) -> Mode {
        match self {
            Self::Demo(s) => s.mode(),
            Self::Flicker(s) => s.mode(),
            Self::Distance(s) => s.mode(),
        }
    }

    fn sample(&mut self) -> Reading {
        match self {
            Self::Demo(s) => s.sample(),
            Self::Flicker(s) => s.sample(),
            Self::Distance(s) => s.sample(),
        }
    }
}
