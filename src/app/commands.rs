//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (keypad, RFID
//! reader, tap push-buttons, operator) that the
//! [`KioskService`](super::service::KioskService) interprets and acts upon.

use heapless::String;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskCommand {
    /// One keypad character (`0-9`, `A-D`, `*`, `#`).
    Key(char),

    /// RFID tag presented, identity as read.
    TagScanned(String<16>),

    /// Debounced press of a tap's own push-button.
    ManualButton(usize),

    /// Operator pause of a running tap.
    PauseTap(usize),

    /// Operator resume of a paused tap.
    ResumeTap(usize),

    /// Operator abort of an open session.
    AbortTap(usize),

    /// Close every valve and end every session.
    Shutdown,
}
