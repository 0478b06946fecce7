//! Interrupt-driven input event queue.
//!
//! Events are produced by:
//! - GPIO ISRs and their debouncers (tap push-buttons)
//! - Keypad / RFID reader drivers
//! - Timer callbacks (control tick, telemetry)
//!
//! Events are consumed by the main control loop, which turns them into
//! [`KioskCommand`](crate::app::commands::KioskCommand)s one at a time.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ Button ISR  │────▶│                  │     │              │
//! │ Keypad      │────▶│   Event Queue    │────▶│  Main Loop   │
//! │ RFID reader │────▶│ (critical sect.) │     │  (consumer)  │
//! │ Timers      │────▶│                  │     │              │
//! └─────────────┘     └──────────────────┘     └──────────────┘
//! ```
//!
//! Flow meter pulses do not pass through here; they go straight to
//! [`flow::on_flow_pulse`](crate::flow::on_flow_pulse).

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, String};

use crate::app::commands::KioskCommand;

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 32;

/// System input events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Control loop tick.
    ControlTick,
    /// Keypad character.
    Key(char),
    /// RFID tag identity.
    TagScanned(String<16>),
    /// Debounced press of tap `n`'s push-button.
    ManualButton(usize),
}

impl Event {
    /// Command form of an input event; `None` for timing events.
    pub fn into_command(self) -> Option<KioskCommand> {
        match self {
            Self::ControlTick => None,
            Self::Key(c) => Some(KioskCommand::Key(c)),
            Self::TagScanned(tag) => Some(KioskCommand::TagScanned(tag)),
            Self::ManualButton(tap) => Some(KioskCommand::ManualButton(tap)),
        }
    }
}

static EVENT_QUEUE: Mutex<RefCell<Deque<Event, EVENT_QUEUE_CAP>>> =
    Mutex::new(RefCell::new(Deque::new()));

/// Push an event into the queue.
/// Safe to call from ISR context.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    critical_section::with(|cs| EVENT_QUEUE.borrow_ref_mut(cs).push_back(event).is_ok())
}

/// Pop the next event from the queue.
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    critical_section::with(|cs| EVENT_QUEUE.borrow_ref_mut(cs).pop_front())
}

/// Drain all pending events into a callback, in FIFO order.
/// The handler runs outside the critical section.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}
