//! Bluetooth proximity detector library.
//!
//! Exposes the control core and its adapters for integration testing.
//! Raspberry Pi specific code is guarded by the `rpi` feature within
//! each adapter.

#![deny(unused_must_use)]

pub mod adapters;
pub mod address;
pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod scheduler;
pub mod shutdown;
