//! Control loop, the orchestrating core.
//!
//! [`ControlLoop`] owns the configured signal source, the level mapper,
//! the activation driver and the tick scheduler.  All I/O flows through
//! port traits injected at call sites, so the whole loop runs against
//! mock adapters and a virtual clock in tests.
//!
//! ```text
//!  SignalSource ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                   │        ControlLoop         │
//!   ClockPort  ◀──▶ │ mapper · driver · schedule │ ──▶ OutputPort
//!                   └────────────────────────────┘
//! ```
//!
//! Lifecycle: `Idle ─start─▶ Running ─shutdown─▶ Stopping ─release─▶ Stopped`.
//! `Stopped` is terminal.

use log::{info, warn};

use super::activation::ActivationDriver;
use super::events::{LoopEvent, TickReport};
use super::level::{ActivationLevel, LevelMapper, Reading};
use super::ports::{ClockPort, EventSink, OutputPort};
use super::sources::SignalSource;
use crate::config::DetectorConfig;
use crate::scheduler::{TickScheduler, TickWait};
use crate::shutdown::ShutdownSignal;

/// Lifecycle of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Built, not started.
    Idle,
    Running,
    /// Shutdown requested; outputs are being released.
    Stopping,
    Stopped,
}

/// Samples the source, maps it and drives the outputs on a fixed cadence.
pub struct ControlLoop<S> {
    source: S,
    mapper: LevelMapper,
    driver: ActivationDriver,
    scheduler: TickScheduler,
    state: LoopState,
    tick_count: u64,
    last_level: ActivationLevel,
}

impl<S: SignalSource> ControlLoop<S> {
    /// Construct the loop from a validated configuration and the source
    /// for its mode.  Does **not** start it.
    pub fn new(config: &DetectorConfig, source: S) -> Self {
        Self {
            source,
            mapper: LevelMapper::from_config(config),
            driver: ActivationDriver::from_config(config),
            scheduler: TickScheduler::new(u64::from(config.settings.tick_interval_ms)),
            state: LoopState::Idle,
            tick_count: 0,
            last_level: ActivationLevel::ZERO,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// `Idle → Running`.  No effect in any other state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        if self.state != LoopState::Idle {
            warn!("ControlLoop: start ignored in {:?}", self.state);
            return;
        }
        self.transition(LoopState::Running, sink);
        sink.emit(&LoopEvent::Started(self.source.mode()));
        info!("ControlLoop started in {} mode", self.source.mode());
    }

    /// Release every output once and finish in `Stopped`.
    ///
    /// Calling it again (or on an already stopping loop) does nothing,
    /// so the outputs are released exactly once.
    pub fn stop(&mut self, out: &mut impl OutputPort, sink: &mut impl EventSink) {
        if matches!(self.state, LoopState::Stopping | LoopState::Stopped) {
            return;
        }
        self.transition(LoopState::Stopping, sink);
        out.release_all();
        self.transition(LoopState::Stopped, sink);
        sink.emit(&LoopEvent::Stopped {
            ticks: self.tick_count,
        });
        info!("ControlLoop stopped after {} ticks", self.tick_count);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cycle: sample → map → drive outputs.
    ///
    /// Returns the applied level, or `None` when the loop is not running.
    pub fn tick(
        &mut self,
        out: &mut impl OutputPort,
        sink: &mut impl EventSink,
    ) -> Option<ActivationLevel> {
        if self.state != LoopState::Running {
            return None;
        }
        self.tick_count += 1;

        let reading = self.source.sample();
        let level = self.mapper.map(reading);
        self.driver.apply(level, out);
        self.last_level = level;

        sink.emit(&LoopEvent::Tick(TickReport {
            tick: self.tick_count,
            mode: self.source.mode(),
            level,
            rssi: match reading {
                Reading::Rssi(rssi) => rssi,
                _ => None,
            },
            pattern: self.driver.pattern(level).as_slice().to_vec(),
            duty: self.driver.duty(level),
        }));
        Some(level)
    }

    /// Start, tick on the configured cadence until `shutdown` is raised,
    /// then stop.  Returns the number of ticks run.
    ///
    /// The signal is checked between ticks only: a tick in progress
    /// (including a blocking RSSI query) always completes.
    pub fn run(
        &mut self,
        out: &mut impl OutputPort,
        clock: &mut impl ClockPort,
        shutdown: &ShutdownSignal,
        sink: &mut impl EventSink,
    ) -> u64 {
        self.start(sink);
        while self.state == LoopState::Running && !shutdown.is_triggered() {
            self.scheduler.begin_tick(clock);
            self.tick(out, sink);
            if let TickWait::Overrun { late_ms } = self.scheduler.wait_for_next(clock) {
                sink.emit(&LoopEvent::Overrun {
                    tick: self.tick_count,
                    late_ms,
                });
            }
        }
        self.stop(out, sink);
        self.tick_count
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Ticks executed since start.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Level applied on the most recent tick.
    pub fn last_level(&self) -> ActivationLevel {
        self.last_level
    }

    /// Ticks that ran past their boundary.
    pub fn overruns(&self) -> u64 {
        self.scheduler.overruns()
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition(&mut self, to: LoopState, sink: &mut impl EventSink) {
        let from = self.state;
        self.state = to;
        sink.emit(&LoopEvent::StateChanged { from, to });
    }
}
