//! GPIO / peripheral pin assignments for the kiosk controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Numbers are ESP32-S3 GPIOs.  Strapping pins (0, 3, 45, 46), USB (19, 20)
//! and the flash/PSRAM bank (26..=37) are left free.

use crate::config::NUM_OF_TAPS;

/// Pins wired to one tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapPins {
    /// Motorised valve: drive HIGH to open.
    pub motor_open: i32,
    /// Motorised valve: drive HIGH to close.
    pub motor_close: i32,
    /// Hall-effect flow meter pulse input (rising-edge interrupt).
    pub flowmeter: i32,
    /// Tap indicator LED.
    pub led: i32,
    /// Manual pause/resume push-button (active-low, pull-up).
    pub button: i32,
}

// ---------------------------------------------------------------------------
// Taps
// ---------------------------------------------------------------------------

pub const TAP_PINS: [TapPins; NUM_OF_TAPS] = [
    TapPins { motor_open: 4, motor_close: 5, flowmeter: 6, led: 7, button: 15 },
    TapPins { motor_open: 16, motor_close: 17, flowmeter: 18, led: 8, button: 9 },
    TapPins { motor_open: 10, motor_close: 11, flowmeter: 12, led: 13, button: 14 },
    TapPins { motor_open: 21, motor_close: 38, flowmeter: 39, led: 40, button: 41 },
];

// ---------------------------------------------------------------------------
// GSM modem
// ---------------------------------------------------------------------------

/// Modem power/reset line.  Asserted LOW to hold the modem in reset.
pub const GSM_RESET_GPIO: i32 = 42;

// ---------------------------------------------------------------------------
// Buzzer
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 47;
