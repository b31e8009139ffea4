//! Port traits: the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (GPIO bank, HCI socket, system clock, log output)
//! implement these traits.  The [`ControlLoop`](super::service::ControlLoop)
//! consumes them via generics, so the core never touches hardware directly.
//!
//! None of the ports return errors.  Output writes are assumed to succeed
//! under normal operation, and every RSSI failure collapses to `None`.

use std::time::Duration;

use crate::address::BdAddr;
use crate::pins::PinId;

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → GPIO / PWM)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the relay bank and the PWM output.
pub trait OutputPort {
    /// Drive `pin` HIGH (`true`) or LOW (`false`).
    fn set_pin_state(&mut self, pin: PinId, high: bool);

    /// Set the PWM duty in percent.  Values outside `0..=100` are passed
    /// through as computed; the adapter decides how to saturate them.
    fn set_duty_cycle(&mut self, percent: i32);

    /// Neutralise every output.  Called exactly once, on shutdown.
    fn release_all(&mut self);
}

// ───────────────────────────────────────────────────────────────
// RSSI port (driven adapter: Bluetooth → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: signal strength of the tracked peer.
pub trait RssiPort {
    /// Connect to `address` (bounded by `timeout`) and read its RSSI.
    ///
    /// Blocks until the read completes or fails.  Connection failure,
    /// malformed replies and timeouts all return `None`.
    fn query_rssi(&mut self, address: &BdAddr, timeout: Duration) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain ↔ time)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.  Swapped for a virtual clock in tests.
pub trait ClockPort {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The loop emits structured [`LoopEvent`](super::events::LoopEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::LoopEvent);
}
