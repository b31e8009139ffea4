//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured loop events through
//! the `log` facade (stderr on the Pi, journald when run as a service).

use log::{Level, debug, info, log};

use crate::app::events::{LoopEvent, TickReport};
use crate::app::level::ActivationLevel;
use crate::app::ports::EventSink;
use crate::config::Mode;

/// Adapter that logs every [`LoopEvent`].
///
/// Per-tick lines are `info` only when the level changes, `debug`
/// otherwise, so an idle detector does not flood the log.
#[derive(Default)]
pub struct LogEventSink {
    last_level: Option<ActivationLevel>,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bar(pattern: &[bool]) -> String {
    pattern.iter().map(|&on| if on { '#' } else { '.' }).collect()
}

/// A missing reading is only a failure in distance mode.
fn rssi_label(t: &TickReport) -> String {
    match (t.rssi, t.mode) {
        (Some(r), _) => r.to_string(),
        (None, Mode::Distance) => "unavailable".to_string(),
        (None, _) => "-".to_string(),
    }
}

fn tick_line(t: &TickReport) -> String {
    let duty = t.duty.map_or_else(|| "-".to_string(), |d| format!("{d}%"));
    format!(
        "TICK | #{} mode={} level={} rssi={} pins=[{}] pwm={}",
        t.tick,
        t.mode,
        t.level,
        rssi_label(t),
        bar(&t.pattern),
        duty,
    )
}

impl LogEventSink {
    /// Level to log `t` at; remembers `t.level` for the next tick.
    fn tick_level(&mut self, t: &TickReport) -> Level {
        let changed = self.last_level.replace(t.level) != Some(t.level);
        if changed { Level::Info } else { Level::Debug }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LoopEvent) {
        match event {
            LoopEvent::Tick(t) => {
                let level = self.tick_level(t);
                log!(level, "{}", tick_line(t));
            }
            LoopEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            LoopEvent::Overrun { tick, late_ms } => {
                debug!("LATE | tick #{} overran by {}ms", tick, late_ms);
            }
            LoopEvent::Started(mode) => {
                info!("START | mode={}", mode);
            }
            LoopEvent::Stopped { ticks } => {
                info!("STOP | ticks={}", ticks);
            }
        }
    }
}
