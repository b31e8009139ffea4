//! Fuzz target: configuration parser
//!
//! Feeds arbitrary bytes to `DetectorConfig::from_json_str` and checks:
//! - No panics on any input
//! - Anything accepted passes `validate` again and builds a driver whose
//!   pattern and duty can be computed for every level in range
//!
//! cargo fuzz run fuzz_config_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use proximity::app::activation::ActivationDriver;
use proximity::app::level::ActivationLevel;
use proximity::config::DetectorConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = DetectorConfig::from_json_str(text) else {
        return;
    };
    assert!(config.validate().is_ok());

    let driver = ActivationDriver::from_config(&config);
    assert_eq!(driver.channels().len(), config.gpio.output_pins.len());
    let max = config.max_activation().min(64);
    for half_steps in 0..=2 * max {
        let level = ActivationLevel::from_half_steps(half_steps);
        let pattern = driver.pattern(level);
        assert_eq!(pattern.as_slice().len(), driver.channels().len());
        let _ = driver.duty(level);
    }
});
