//! Fixed-cadence tick scheduler.
//!
//! Each tick starts on a boundary `interval` after the previous tick's
//! start.  Work that finishes early sleeps out the remainder; work that
//! runs past the boundary (a slow RSSI query) starts the next tick
//! immediately and is reported as an overrun.  Missed boundaries are
//! never made up with back-to-back ticks.
//!
//! ```text
//!   start ──▶ work ──▶ sleep ──▶│ start ──▶ work ───────────▶│ start
//!   |◀──────── interval ───────▶|◀────── overrun (late) ─────▶|
//! ```
//!
//! Time comes from a [`ClockPort`], so tests drive the scheduler with
//! a virtual clock.

use log::debug;

use crate::app::ports::ClockPort;

/// Result of waiting for the next tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickWait {
    /// Slept `ms` milliseconds to reach the boundary.
    Slept(u64),
    /// The tick ran `late_ms` past its boundary; no sleep.
    Overrun { late_ms: u64 },
}

/// Keeps ticks on a fixed cadence.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval_ms: u64,
    /// Start of the tick in progress.
    tick_started_ms: Option<u64>,
    overruns: u64,
}

impl TickScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            tick_started_ms: None,
            overruns: 0,
        }
    }

    /// Mark the start of a tick.
    pub fn begin_tick(&mut self, clock: &impl ClockPort) {
        self.tick_started_ms = Some(clock.now_ms());
    }

    /// Sleep until `interval` after the last [`begin_tick`](Self::begin_tick).
    ///
    /// Without a preceding `begin_tick` a whole interval is slept.
    pub fn wait_for_next(&mut self, clock: &mut impl ClockPort) -> TickWait {
        let now = clock.now_ms();
        let deadline = self.tick_started_ms.take().unwrap_or(now) + self.interval_ms;
        if now < deadline {
            let ms = deadline - now;
            clock.sleep_ms(ms);
            TickWait::Slept(ms)
        } else {
            let late_ms = now - deadline;
            self.overruns += 1;
            debug!("Scheduler: tick overran by {}ms", late_ms);
            TickWait::Overrun { late_ms }
        }
    }

    /// Ticks that ran past their boundary since startup.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
