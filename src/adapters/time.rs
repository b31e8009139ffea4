//! System clock adapter.
//!
//! Implements [`ClockPort`] with `std::time::Instant` (monotonic) and
//! `std::thread::sleep`.  Tests use a virtual clock instead.

use std::time::{Duration, Instant};

use crate::app::ports::ClockPort;

/// Monotonic wall-time clock, origin at construction.
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
