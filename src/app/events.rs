//! Outbound loop events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to the console, count them in a
//! test, etc.

use super::level::ActivationLevel;
use super::service::LoopState;
use crate::config::Mode;

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// The loop has started (carries the active mode).
    Started(Mode),

    /// One tick was applied to the outputs.
    Tick(TickReport),

    /// The loop changed lifecycle state.
    StateChanged { from: LoopState, to: LoopState },

    /// A tick ran past its boundary (e.g. a slow RSSI query).
    Overrun { tick: u64, late_ms: u64 },

    /// The loop has stopped after `ticks` ticks.
    Stopped { ticks: u64 },
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub mode: Mode,
    pub level: ActivationLevel,
    /// Raw RSSI behind the level (distance mode only).
    pub rssi: Option<i8>,
    /// Logical pin pattern, configuration order.
    pub pattern: Vec<bool>,
    /// PWM duty written, if a PWM pin is fitted.
    pub duty: Option<i32>,
}
