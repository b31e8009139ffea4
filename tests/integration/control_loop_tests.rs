//! Integration tests for the source → mapper → driver → outputs pipeline.
//!
//! The loop runs against `MockOutput` and a `VirtualClock`; shutdown is
//! raised from inside the clock so cancellation lands between ticks
//! exactly as an interrupt would, or from inside the RSSI reader to land
//! in the middle of a query.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::mock_hw::{MockOutput, OutputCall, RecordingSink, ScriptedRssi, VirtualClock};

use proximity::address::BdAddr;
use proximity::app::events::LoopEvent;
use proximity::app::level::ActivationLevel;
use proximity::app::service::{ControlLoop, LoopState};
use proximity::app::sources::{DemoSource, ModeSource};
use proximity::config::{DetectorConfig, Mode};
use proximity::shutdown::ShutdownSignal;

type TestSource = ModeSource<ScriptedRssi, StdRng>;

fn distance_config(min_rssi: i32, max_rssi: i32) -> DetectorConfig {
    let mut config = DetectorConfig::default();
    config.settings.mode = Mode::Distance;
    config.bluetooth.target = "00:1A:7D:DA:71:13".parse().unwrap();
    config.bluetooth.min_rssi = min_rssi;
    config.bluetooth.max_rssi = max_rssi;
    config.validate().unwrap();
    config
}

fn distance_loop(config: &DetectorConfig, replies: Vec<Option<i8>>) -> ControlLoop<TestSource> {
    let source = ModeSource::from_config(config, ScriptedRssi::new(replies), StdRng::seed_from_u64(7));
    ControlLoop::new(config, source)
}

fn pin_writes(calls: &[OutputCall]) -> Vec<(u8, bool)> {
    calls
        .iter()
        .filter_map(|c| match c {
            OutputCall::Pin { pin, high } => Some((*pin, *high)),
            _ => None,
        })
        .collect()
}

// ── Level 4 of 10 on three active-high pins ──────────────────

#[test]
fn level_four_lights_two_of_three_pins_at_forty_percent() {
    // 10 * (20 - 0) / 50 = 4
    let config = distance_config(0, 50);
    let mut control = distance_loop(&config, vec![Some(20)]);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    control.start(&mut sink);
    assert_eq!(control.tick(&mut out, &mut sink), Some(ActivationLevel::from_whole(4)));

    assert_eq!(
        out.calls,
        vec![
            OutputCall::Pin { pin: 15, high: true },
            OutputCall::Pin { pin: 17, high: true },
            OutputCall::Pin { pin: 18, high: false },
            OutputCall::Duty(40),
        ]
    );

    let ticks = sink.ticks();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].rssi, Some(20));
    assert_eq!(ticks[0].pattern, vec![true, true, false]);
    assert_eq!(ticks[0].duty, Some(40));
}

#[test]
fn active_low_pins_are_inverted_on_the_wire() {
    let mut config = distance_config(0, 50);
    config.gpio.on_states = vec![false, true, false];
    let mut control = distance_loop(&config, vec![Some(20)]);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    control.start(&mut sink);
    control.tick(&mut out, &mut sink);

    // logical [on, on, off]
    assert_eq!(pin_writes(&out.calls), vec![(15, false), (17, true), (18, true)]);
}

// ── RSSI failures ─────────────────────────────────────────────

#[test]
fn failed_rssi_query_is_level_zero_for_that_tick_only() {
    let config = distance_config(0, 50);
    let mut control = distance_loop(&config, vec![Some(50), None, Some(50)]);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    control.start(&mut sink);
    let levels: Vec<_> = (0..3).filter_map(|_| control.tick(&mut out, &mut sink)).collect();

    assert_eq!(
        levels,
        vec![
            ActivationLevel::from_whole(10),
            ActivationLevel::ZERO,
            ActivationLevel::from_whole(10),
        ]
    );
    assert_eq!(sink.ticks()[1].rssi, None);
    assert_eq!(sink.ticks()[1].duty, Some(0));
}

#[test]
fn negative_rssi_counts_as_zero_over_a_run() {
    let config = distance_config(-100, 25);
    let shutdown = ShutdownSignal::new();
    let mut clock = VirtualClock::stop_after(&shutdown, 3);
    let mut control = distance_loop(&config, vec![Some(-40); 3]);
    let mut out = MockOutput::new();

    let ticks = control.run(&mut out, &mut clock, &shutdown, &mut RecordingSink::new());

    assert_eq!(ticks, 3);
    // floored at 0: 10 * (0 + 100) / 125 = 8
    assert_eq!(control.last_level(), ActivationLevel::from_whole(8));
    assert_eq!(out.last_duty(), Some(80));
}

#[test]
fn out_of_window_rssi_is_passed_through_unless_clamped() {
    // 10 * (100 - 0) / 50 = 20
    let config = distance_config(0, 50);
    let mut control = distance_loop(&config, vec![Some(100)]);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();
    control.start(&mut sink);
    assert_eq!(control.tick(&mut out, &mut sink), Some(ActivationLevel::from_whole(20)));
    assert_eq!(out.last_duty(), Some(200));

    let mut config = distance_config(0, 50);
    config.settings.clamp_distance_level = true;
    let mut control = distance_loop(&config, vec![Some(100)]);
    let mut out = MockOutput::new();
    control.start(&mut sink);
    assert_eq!(control.tick(&mut out, &mut sink), Some(ActivationLevel::from_whole(10)));
    assert_eq!(out.last_duty(), Some(100));
}

// ── Cancellation ──────────────────────────────────────────────

#[test]
fn shutdown_between_ticks_releases_exactly_once() {
    let config = DetectorConfig::default();
    let shutdown = ShutdownSignal::new();
    let mut clock = VirtualClock::stop_after(&shutdown, 4);
    let mut control = ControlLoop::new(&config, DemoSource::new(config.max_activation()));
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    let ticks = control.run(&mut out, &mut clock, &shutdown, &mut sink);

    assert_eq!(ticks, 4);
    assert_eq!(out.releases(), 1);
    assert!(out.calls_after_release().is_empty(), "no output writes after release");
    assert_eq!(out.calls.last(), Some(&OutputCall::ReleaseAll));
    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(sink.ticks().len(), 4);
    assert_eq!(sink.events.last(), Some(&LoopEvent::Stopped { ticks: 4 }));

    // Stopped is terminal.
    control.stop(&mut out, &mut sink);
    assert_eq!(out.releases(), 1);
}

#[test]
fn shutdown_during_rssi_query_finishes_the_tick_then_releases() {
    // 10 * (20 - 0) / 50 = 4; the third reply must never be read.
    let config = distance_config(0, 50);
    let shutdown = ShutdownSignal::new();
    let reader = ScriptedRssi::stop_during([Some(20), Some(20), Some(50)], &shutdown, 2);
    let queries = reader.query_count();
    let source = ModeSource::from_config(&config, reader, StdRng::seed_from_u64(7));
    let mut control = ControlLoop::new(&config, source);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    let ticks = control.run(&mut out, &mut VirtualClock::new(), &shutdown, &mut sink);

    assert_eq!(ticks, 2);
    assert_eq!(queries.get(), 2, "no query after the interrupt");

    // The interrupted tick still applied its level before the release.
    let last_tick = sink.ticks()[1];
    assert_eq!(last_tick.rssi, Some(20));
    assert_eq!(last_tick.level, ActivationLevel::from_whole(4));
    assert_eq!(control.last_level(), ActivationLevel::from_whole(4));
    assert_eq!(out.last_duty(), Some(40));
    assert_eq!(out.pin_level(17), Some(true));
    assert_eq!(out.pin_level(18), Some(false));

    assert_eq!(out.releases(), 1);
    assert_eq!(out.calls.last(), Some(&OutputCall::ReleaseAll));
    assert!(out.calls_after_release().is_empty());
    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(sink.events.last(), Some(&LoopEvent::Stopped { ticks: 2 }));
}

#[test]
fn shutdown_before_run_still_releases_without_ticking() {
    let config = DetectorConfig::default();
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();
    let mut control = ControlLoop::new(&config, DemoSource::new(config.max_activation()));
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    let ticks = control.run(&mut out, &mut VirtualClock::new(), &shutdown, &mut sink);

    assert_eq!(ticks, 0);
    assert_eq!(out.calls, vec![OutputCall::ReleaseAll]);
}

// ── Cadence ───────────────────────────────────────────────────

#[test]
fn ticks_are_spaced_by_the_configured_interval() {
    let mut config = DetectorConfig::default();
    config.settings.tick_interval_ms = 2_000;
    let shutdown = ShutdownSignal::new();
    let mut clock = VirtualClock::stop_after(&shutdown, 3);
    let mut control = ControlLoop::new(&config, DemoSource::new(config.max_activation()));

    control.run(&mut MockOutput::new(), &mut clock, &shutdown, &mut RecordingSink::new());

    assert_eq!(clock.sleeps, vec![2_000, 2_000, 2_000]);
    assert_eq!(clock.now, 6_000);
    assert_eq!(control.overruns(), 0);
}

// ── Demo ramp ─────────────────────────────────────────────────

#[test]
fn demo_ramp_covers_every_half_step_then_wraps() {
    let config = DetectorConfig::default();
    let shutdown = ShutdownSignal::new();
    let mut clock = VirtualClock::stop_after(&shutdown, 22);
    let mut control = ControlLoop::new(&config, DemoSource::new(config.max_activation()));
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    control.run(&mut out, &mut clock, &shutdown, &mut sink);

    let levels: Vec<i32> = sink.ticks().iter().map(|t| t.level.half_steps()).collect();
    let mut expected: Vec<i32> = (0..=20).collect();
    expected.push(0);
    assert_eq!(levels, expected);

    // 4.5 is strictly above threshold 3 but not 6: two pins on, duty 45.
    let at_4_5 = sink.ticks()[9];
    assert_eq!(at_4_5.level.to_string(), "4.5");
    assert_eq!(at_4_5.pattern, vec![true, true, false]);
    assert_eq!(at_4_5.duty, Some(45));
}

// ── Flicker ───────────────────────────────────────────────────

#[test]
fn flicker_levels_stay_within_the_table() {
    let mut config = DetectorConfig::default();
    config.settings.mode = Mode::Flicker;
    let source: TestSource =
        ModeSource::from_config(&config, ScriptedRssi::new([]), StdRng::seed_from_u64(42));
    let mut control = ControlLoop::new(&config, source);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    control.start(&mut sink);
    for _ in 0..2_000 {
        let level = control.tick(&mut out, &mut sink).unwrap();
        assert!(
            [0, 1, 2].map(ActivationLevel::from_whole).contains(&level),
            "unexpected flicker level {level}"
        );
    }
    assert_eq!(
        sink.events.first(),
        Some(&LoopEvent::StateChanged {
            from: LoopState::Idle,
            to: LoopState::Running,
        })
    );
    assert!(sink.events.contains(&LoopEvent::Started(Mode::Flicker)));
}

#[test]
fn unset_target_still_runs_and_reads_nothing() {
    let mut config = DetectorConfig::default();
    config.settings.mode = Mode::Distance;
    assert!(config.bluetooth.target.is_unset());
    let mut control = distance_loop(&config, vec![]);
    let mut out = MockOutput::new();
    let mut sink = RecordingSink::new();

    control.start(&mut sink);
    assert_eq!(control.tick(&mut out, &mut sink), Some(ActivationLevel::ZERO));
    assert_eq!(pin_writes(&out.calls), vec![(15, false), (17, false), (18, false)]);
    assert_eq!(BdAddr::default(), config.bluetooth.target);
}
