//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod button;
pub mod gpio;
pub mod hw_init;
pub mod hw_timer;
pub mod indicator;
pub mod valve;
pub mod watchdog;
