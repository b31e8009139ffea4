//! Mock adapters for integration tests.
//!
//! Records every output call so tests can assert on the full command
//! history without touching real GPIO pins, and replaces wall time with
//! a virtual clock that can raise the shutdown signal on cue.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use proximity::address::BdAddr;
use proximity::app::events::{LoopEvent, TickReport};
use proximity::app::ports::{ClockPort, EventSink, OutputPort, RssiPort};
use proximity::pins::PinId;
use proximity::shutdown::ShutdownSignal;

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCall {
    Pin { pin: PinId, high: bool },
    Duty(i32),
    ReleaseAll,
}

// ── MockOutput ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockOutput {
    pub calls: Vec<OutputCall>,
}

#[allow(dead_code)]
impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn releases(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == OutputCall::ReleaseAll)
            .count()
    }

    /// Last wire level written to `pin`, if any.
    pub fn pin_level(&self, pin: PinId) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::Pin { pin: p, high } if *p == pin => Some(*high),
            _ => None,
        })
    }

    pub fn last_duty(&self) -> Option<i32> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::Duty(d) => Some(*d),
            _ => None,
        })
    }

    /// Calls recorded after the (single) release.
    pub fn calls_after_release(&self) -> &[OutputCall] {
        match self.calls.iter().position(|c| *c == OutputCall::ReleaseAll) {
            Some(i) => &self.calls[i + 1..],
            None => &[],
        }
    }
}

impl OutputPort for MockOutput {
    fn set_pin_state(&mut self, pin: PinId, high: bool) {
        self.calls.push(OutputCall::Pin { pin, high });
    }

    fn set_duty_cycle(&mut self, percent: i32) {
        self.calls.push(OutputCall::Duty(percent));
    }

    fn release_all(&mut self) {
        self.calls.push(OutputCall::ReleaseAll);
    }
}

// ── VirtualClock ──────────────────────────────────────────────

/// Sleeping advances time instantly.  Optionally raises a shutdown
/// signal once a given number of sleeps have happened.
#[derive(Default)]
pub struct VirtualClock {
    pub now: u64,
    pub sleeps: Vec<u64>,
    shutdown: Option<(ShutdownSignal, usize)>,
}

#[allow(dead_code)]
impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `signal` during the `after`-th sleep.
    pub fn stop_after(signal: &ShutdownSignal, after: usize) -> Self {
        Self {
            shutdown: Some((signal.clone(), after)),
            ..Self::new()
        }
    }
}

impl ClockPort for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now += ms;
        if let Some((signal, after)) = &self.shutdown {
            if self.sleeps.len() >= *after {
                signal.trigger();
            }
        }
    }
}

// ── ScriptedRssi ──────────────────────────────────────────────

/// Replays canned RSSI answers; `None` once the script runs out.
///
/// The query counter is shared so a test can still read it after the
/// reader has been moved into the control loop.  Optionally raises a
/// shutdown signal while the `nth` query is in flight.
pub struct ScriptedRssi {
    replies: VecDeque<Option<i8>>,
    pub queries: Vec<(BdAddr, Duration)>,
    count: Rc<Cell<usize>>,
    shutdown: Option<(ShutdownSignal, usize)>,
}

#[allow(dead_code)]
impl ScriptedRssi {
    pub fn new(replies: impl IntoIterator<Item = Option<i8>>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            queries: Vec::new(),
            count: Rc::default(),
            shutdown: None,
        }
    }

    /// Raise `signal` in the middle of the `nth` query (1-based).
    pub fn stop_during(
        replies: impl IntoIterator<Item = Option<i8>>,
        signal: &ShutdownSignal,
        nth: usize,
    ) -> Self {
        Self {
            shutdown: Some((signal.clone(), nth)),
            ..Self::new(replies)
        }
    }

    pub fn query_count(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.count)
    }
}

impl RssiPort for ScriptedRssi {
    fn query_rssi(&mut self, address: &BdAddr, timeout: Duration) -> Option<i8> {
        self.queries.push((*address, timeout));
        self.count.set(self.count.get() + 1);
        if let Some((signal, nth)) = &self.shutdown {
            if self.count.get() == *nth {
                signal.trigger();
            }
        }
        self.replies.pop_front().flatten()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<LoopEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> Vec<&TickReport> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LoopEvent::Tick(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &LoopEvent) {
        self.events.push(event.clone());
    }
}
