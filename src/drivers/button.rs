//! ISR-debounced per-tap push-buttons.
//!
//! ## Hardware
//!
//! One active-low momentary switch per tap with a pull-up.  Each GPIO
//! fires on its falling edge; the ISR only records the raw timestamp into
//! that tap's atomic, and [`ButtonBank::tick`] (called from the main loop
//! once per control cycle) runs the debounce for all taps.
//!
//! A press is accepted once the line has stayed low for [`DEBOUNCE_MS`].
//! Each accepted press yields exactly one `Event::ManualButton(tap)`;
//! holding the button does not repeat.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::NUM_OF_TAPS;
use crate::events::{push_event, Event};
use crate::pins::TAP_PINS;

const DEBOUNCE_MS: u32 = 50;

/// Raw ISR timestamps (milliseconds since boot, truncated to u32), one per
/// tap.  Written by the ISR, read by the main loop.
static BUTTON_ISR_TIMESTAMP: [AtomicU32; NUM_OF_TAPS] = [const { AtomicU32::new(0) }; NUM_OF_TAPS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Released,
    Settling { since_ms: u32 },
    Held,
}

pub struct ButtonBank {
    state: [DebounceState; NUM_OF_TAPS],
    last_isr_ms: [u32; NUM_OF_TAPS],
}

impl Default for ButtonBank {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonBank {
    pub fn new() -> Self {
        Self {
            state: [DebounceState::Released; NUM_OF_TAPS],
            last_isr_ms: [0; NUM_OF_TAPS],
        }
    }

    /// Call from the main loop at each control tick.  Accepted presses are
    /// pushed onto the input event queue; the count is returned.
    pub fn tick(&mut self, now_ms: u32) -> usize {
        let mut pressed = 0;
        for tap in 0..NUM_OF_TAPS {
            if self.tick_one(tap, now_ms) && push_event(Event::ManualButton(tap)) {
                pressed += 1;
            }
        }
        pressed
    }

    fn tick_one(&mut self, tap: usize, now_ms: u32) -> bool {
        let isr_ms = BUTTON_ISR_TIMESTAMP[tap].load(Ordering::Acquire);
        let new_edge = isr_ms != 0 && isr_ms != self.last_isr_ms[tap];
        let level_low = is_pressed_hw(tap);

        match self.state[tap] {
            DebounceState::Released => {
                if new_edge {
                    self.last_isr_ms[tap] = isr_ms;
                    self.state[tap] = DebounceState::Settling { since_ms: now_ms };
                }
                false
            }
            DebounceState::Settling { since_ms } => {
                if new_edge {
                    // Bounce: restart the window.
                    self.last_isr_ms[tap] = isr_ms;
                    self.state[tap] = DebounceState::Settling { since_ms: now_ms };
                    return false;
                }
                if !level_low {
                    self.state[tap] = DebounceState::Released;
                    return false;
                }
                if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    self.state[tap] = DebounceState::Held;
                    return true;
                }
                false
            }
            DebounceState::Held => {
                if !level_low {
                    self.state[tap] = DebounceState::Released;
                    // Edges recorded while held were bounce.
                    self.last_isr_ms[tap] = isr_ms;
                }
                false
            }
        }
    }
}

/// ISR handler: register this on each tap button's falling edge.
/// Safe to call from interrupt context (lock-free atomic store).
pub fn button_isr_handler(tap: usize, now_ms: u32) {
    if let Some(slot) = BUTTON_ISR_TIMESTAMP.get(tap) {
        // 0 means "never pressed"; nudge a press at exactly t=0.
        slot.store(now_ms.max(1), Ordering::Release);
    }
}

#[cfg(target_os = "espidf")]
fn is_pressed_hw(tap: usize) -> bool {
    !crate::drivers::hw_init::gpio_read(TAP_PINS[tap].button)
}

#[cfg(not(target_os = "espidf"))]
fn is_pressed_hw(tap: usize) -> bool {
    sim::is_held(tap)
}

/// Host-side stand-in for the button input levels.
#[cfg(not(target_os = "espidf"))]
pub mod sim {
    use core::sync::atomic::{AtomicBool, Ordering};

    use crate::config::NUM_OF_TAPS;

    static HELD: [AtomicBool; NUM_OF_TAPS] = [const { AtomicBool::new(false) }; NUM_OF_TAPS];

    pub fn set_held(tap: usize, held: bool) {
        if let Some(h) = HELD.get(tap) {
            h.store(held, Ordering::Release);
        }
    }

    pub(super) fn is_held(tap: usize) -> bool {
        HELD.get(tap).is_some_and(|h| h.load(Ordering::Acquire))
    }
}

/// Button GPIO for `tap`, for ISR registration.
pub fn button_gpio(tap: usize) -> Option<i32> {
    TAP_PINS.get(tap).map(|p| p.button)
}
