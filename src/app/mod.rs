//! Control core: level mapping, output activation and the tick loop.
//!
//! This module contains the rules that turn a signal sample into relay
//! and PWM states.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod activation;
pub mod events;
pub mod level;
pub mod ports;
pub mod service;
pub mod sources;
