//! Cooperative shutdown signal.
//!
//! The interrupt handler (Ctrl-C / SIGTERM) runs on its own thread and
//! only raises a flag; the control loop polls it between ticks.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ SIGINT      │────▶│  AtomicBool  │────▶│ ControlLoop  │
//! │ SIGTERM     │────▶│  (lock-free) │     │ (between     │
//! │ tests       │────▶│              │     │  ticks)      │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, clonable cancellation flag.  Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.  Safe to call from any thread, any number of times.
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
