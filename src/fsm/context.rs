//! Shared mutable context threaded through every UI state handler.
//!
//! `UiContext` is the blackboard the handlers read from and write to: the
//! pending input, the entry buffers, timing, and the outputs collected by
//! [`PaymentStateMachine`](super::PaymentStateMachine) after each step.

use heapless::String;

use crate::app::ports::Tone;
use crate::config::{AMOUNT_DIGITS, KioskConfig, PHONE_DIGITS};
use crate::error::InputError;
use crate::transaction::TransactionRecord;

/// One input event for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiInput {
    Key(char),
    TagScanned(String<16>),
    /// The coordinator opened a tap for the pending payment.
    DispenseStarted,
}

pub struct UiContext {
    // -- Timing --
    pub now_ms: u64,
    /// Milliseconds since the current state was entered.
    pub ms_in_state: u64,
    pub ui_timeout_ms: u64,

    // -- Input --
    /// Consumed by the current state's `on_update`.
    pub input: Option<UiInput>,

    // -- Session buffers --
    pub phone: String<PHONE_DIGITS>,
    pub amount: String<AMOUNT_DIGITS>,
    pub selected_tap: Option<usize>,

    // -- Outputs --
    pub outbox: Option<TransactionRecord>,
    pub rejected: Option<InputError>,
    pub tone: Option<Tone>,
}

impl UiContext {
    pub fn new(config: &KioskConfig) -> Self {
        Self {
            now_ms: 0,
            ms_in_state: 0,
            ui_timeout_ms: config.ui_timeout_ms,
            input: None,
            phone: String::new(),
            amount: String::new(),
            selected_tap: None,
            outbox: None,
            rejected: None,
            tone: None,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.ms_in_state >= self.ui_timeout_ms
    }

    pub fn clear_session(&mut self) {
        self.phone.clear();
        self.amount.clear();
        self.selected_tap = None;
    }

    pub fn accept(&mut self) {
        self.tone = Some(Tone::Accept);
    }

    pub fn reject(&mut self, err: InputError) {
        self.rejected = Some(err);
        self.tone = Some(Tone::Reject);
    }

    /// Amount buffer as units; `0` when empty.
    pub fn amount_units(&self) -> u32 {
        self.amount.parse().unwrap_or(0)
    }
}
