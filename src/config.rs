//! System configuration parameters
//!
//! All tunable parameters for the WaterKiosk controller.  Defaults match the
//! constants the kiosk shipped with; every timeout is a plain field so a
//! deployment can override it without touching the state machines.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Number of physical taps (valves) on the kiosk.
pub const NUM_OF_TAPS: usize = 4;

/// Digits in a mobile-money phone number.
pub const PHONE_DIGITS: usize = 10;

/// Digits accepted for a purchase amount.
pub const AMOUNT_DIGITS: usize = 4;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskConfig {
    // --- Metering ---
    /// Flow-sensor pulses per paid unit of volume (calibration).
    pub pulses_per_unit: u32,
    /// Paused tap auto-closes after this long (milliseconds).
    pub pause_timeout_ms: u64,

    // --- Payment UI ---
    /// Idle time allowed in any non-idle UI state (milliseconds).
    pub ui_timeout_ms: u64,
    /// Units dispensed per card scan (capped by remaining credit).
    pub card_dispense_units: u32,

    // --- Connectivity ---
    /// Cellular access point name.
    pub apn: String<32>,
    /// MQTT broker host.
    pub broker_host: String<64>,
    /// MQTT broker port.
    pub broker_port: u16,
    /// Topic prefix; topics are `<prefix>/<imei>/tx` and `<prefix>/<imei>/rx`.
    pub topic_prefix: String<32>,
    /// Soft failures tolerated before the modem is power-cycled.
    pub max_retries: u8,
    /// Broker liveness check period (milliseconds).
    pub heartbeat_interval_ms: u64,
    /// First retry delay after a soft failure (milliseconds).
    pub retry_backoff_ms: u64,
    /// Upper bound for the doubling retry delay (milliseconds).
    pub max_backoff_ms: u64,
    /// How long the modem reset line is held asserted (milliseconds).
    pub reset_hold_ms: u64,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            // Metering
            pulses_per_unit: 10,
            pause_timeout_ms: 180_000, // 3 min

            // Payment UI
            ui_timeout_ms: 45_000, // 45 s
            card_dispense_units: 20,

            // Connectivity
            apn: fixed("iot.safaricom.com"),
            broker_host: fixed("167.99.196.28"),
            broker_port: 1883,
            topic_prefix: fixed("kiosk"),
            max_retries: 3,
            heartbeat_interval_ms: 60_000, // 60 s
            retry_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
            reset_hold_ms: 200,

            // Timing
            control_loop_interval_ms: 50, // 20 Hz
            telemetry_interval_secs: 300, // 5 min
        }
    }
}

impl KioskConfig {
    /// Range-check every field.  Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulses_per_unit == 0 {
            return Err(ConfigError::ValidationFailed("pulses_per_unit must be > 0"));
        }
        if self.pause_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("pause_timeout_ms must be > 0"));
        }
        if self.ui_timeout_ms < 5_000 {
            return Err(ConfigError::ValidationFailed("ui_timeout_ms must be >= 5000"));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ValidationFailed("max_retries must be >= 1"));
        }
        if self.retry_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::ValidationFailed(
                "retry_backoff_ms must not exceed max_backoff_ms",
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("heartbeat_interval_ms must be > 0"));
        }
        if self.broker_host.is_empty() || self.apn.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_host and apn are required"));
        }
        if self.control_loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("control_loop_interval_ms must be > 0"));
        }
        Ok(())
    }
}

/// Errors raised by [`KioskConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}

fn fixed<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
