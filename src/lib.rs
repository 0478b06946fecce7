//! WaterKiosk firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod fsm;
pub mod link;
pub mod pins;
pub mod tap;
pub mod transaction;

// The ESP-IDF paths inside these are cfg-gated; on the host they run
// against simulation stubs.
pub mod adapters;
pub mod drivers;
