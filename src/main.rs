//! Proximity detector: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  PinBank        HciRssiReader   SystemClock   LogEventSink   │
//! │  (OutputPort)   (RssiPort)      (ClockPort)   (EventSink)    │
//! │                                                              │
//! │  ────────────────── Port Trait Boundary ──────────────────   │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            ControlLoop (pure logic)                    │  │
//! │  │  SignalSource · LevelMapper · ActivationDriver         │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  TickScheduler · ShutdownSignal (Ctrl-C / SIGTERM)           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::filter::LevelFilter;

use proximity::adapters::bluetooth::HciRssiReader;
use proximity::adapters::gpio::RpiPinBank;
use proximity::adapters::log_sink::LogEventSink;
use proximity::adapters::time::SystemClock;
use proximity::app::service::ControlLoop;
use proximity::app::sources::ModeSource;
use proximity::config::{DetectorConfig, Mode};
use proximity::shutdown::ShutdownSignal;

/// Drive relays and a PWM output from a Bluetooth peer's proximity.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "detector.json")]
    config: PathBuf,

    /// Override the configured mode (demo, flicker, distance or 0/1/2).
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(short, long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,
}

fn log_config(config: &DetectorConfig) {
    let gpio = &config.gpio;
    let bt = &config.bluetooth;
    info!("mode            : {}", config.settings.mode);
    info!("tick interval   : {}ms", config.settings.tick_interval_ms);
    info!("max activation  : {}", gpio.max_activation);
    info!("output pins     : {:?}", gpio.output_pins);
    info!("on states       : {:?}", gpio.on_states);
    match gpio.pwm_pin {
        Some(pin) => info!("pwm pin         : {} @ {}Hz", pin, gpio.pwm_frequency_hz),
        None => info!("pwm pin         : none"),
    }
    if config.settings.mode == Mode::Distance {
        info!("target          : {}", bt.target);
        info!("rssi window     : {}..{} (timeout {}s)", bt.min_rssi, bt.max_rssi, bt.timeout_secs);
        info!("clamp level     : {}", config.settings.clamp_distance_level);
    }
}

fn main() -> Result<()> {
    // ── 1. Logging + arguments ────────────────────────────────
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("╔══════════════════════════════════════╗");
    info!("║  Proximity detector v{}           ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let mut config = DetectorConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(mode) = args.mode {
        config.settings.mode = mode;
        config.validate().context("mode override")?;
    }
    if config.settings.mode == Mode::Distance && config.bluetooth.target.is_unset() {
        warn!("distance mode with no target address: every reading will fail");
    }
    log_config(&config);

    // ── 3. Hardware ───────────────────────────────────────────
    let mut bank = RpiPinBank::open(&config).context("opening GPIO")?;

    // ── 4. Interrupt handling ─────────────────────────────────
    let shutdown = ShutdownSignal::new();
    let handler_signal = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received, stopping after the current tick");
        handler_signal.trigger();
    })
    .context("installing interrupt handler")?;

    // ── 5. Control loop ───────────────────────────────────────
    let source = ModeSource::from_config(&config, HciRssiReader::new(), rand::thread_rng());
    let mut control = ControlLoop::new(&config, source);
    let ticks = control.run(
        &mut bank,
        &mut SystemClock::new(),
        &shutdown,
        &mut LogEventSink::new(),
    );

    info!("exiting after {} ticks ({} overruns)", ticks, control.overruns());
    Ok(())
}
