//! Function-pointer finite state machine engine for the payment UI.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌────────────────────┬──────────┬─────────┬──────────────────┐ │
//! │  │ UiState            │ on_enter │ on_exit │ on_update        │ │
//! │  ├────────────────────┼──────────┼─────────┼──────────────────┤ │
//! │  │ HomeIdle           │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ │
//! │  │ EnterPhone         │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ │
//! │  │ EnterAmount        │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ │
//! │  │ EnterTap           │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ │
//! │  │ WaitingForTapOrKey │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ │
//! │  └────────────────────┴──────────┴─────────┴──────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state with
//! the pending input (if any) parked in the context.  If it returns
//! `Some(next_id)`, the engine runs `on_exit` for the current state, then
//! `on_enter` for the next, and records the entry time used by the
//! session timeout.
//!
//! [`PaymentStateMachine`] wraps engine and context behind a small
//! key / tag / tick API.

pub mod context;
pub mod states;

use context::{UiContext, UiInput};
use heapless::String;
use log::info;
use serde::Serialize;

use crate::app::ports::Tone;
use crate::config::KioskConfig;
use crate::error::InputError;
use crate::transaction::TransactionRecord;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all payment UI states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum UiState {
    HomeIdle = 0,
    EnterPhone = 1,
    EnterAmount = 2,
    EnterTap = 3,
    WaitingForTapOrKey = 4,
}

impl UiState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to `UiState`.  Out-of-range falls back to
    /// `HomeIdle`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::HomeIdle,
            1 => Self::EnterPhone,
            2 => Self::EnterAmount,
            3 => Self::EnterTap,
            4 => Self::WaitingForTapOrKey,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::HomeIdle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut UiContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut UiContext) -> Option<UiState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single UI state.
pub struct StateDescriptor {
    pub id: UiState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `UiState as usize`.
    table: [StateDescriptor; UiState::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Timestamp at which the current state was entered.
    state_entry_ms: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; UiState::COUNT], initial: UiState) -> Self {
        Self {
            table,
            current: initial as usize,
            state_entry_ms: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut UiContext) {
        info!("UI starting in state: {}", self.table[self.current].name);
        self.state_entry_ms = ctx.now_ms;
        ctx.ms_in_state = 0;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one step at `ctx.now_ms`.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut UiContext) {
        ctx.ms_in_state = ctx.now_ms.saturating_sub(self.state_entry_ms);

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition regardless of `on_update`.
    pub fn force_transition(&mut self, next: UiState, ctx: &mut UiContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> UiState {
        UiState::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: UiState, ctx: &mut UiContext) {
        let next_idx = next_id as usize;

        info!(
            "UI transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_ms = ctx.now_ms;
        ctx.ms_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Payment state machine facade
// ---------------------------------------------------------------------------

/// What one input produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiOutcome {
    /// Completed payment entry, ready for the coordinator.
    pub record: Option<TransactionRecord>,
    /// The input was refused, or the session timed out.
    pub error: Option<InputError>,
    /// Buzzer feedback for the input.
    pub tone: Option<Tone>,
}

/// Keypad / RFID payment entry on top of the table engine.
pub struct PaymentStateMachine {
    fsm: Fsm,
    ctx: UiContext,
}

impl PaymentStateMachine {
    pub fn new(config: &KioskConfig) -> Self {
        let mut fsm = Fsm::new(states::build_state_table(), UiState::HomeIdle);
        let mut ctx = UiContext::new(config);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    /// Feed one keypad character.
    pub fn handle_key(&mut self, key: char, now_ms: u64) -> UiOutcome {
        self.step(Some(UiInput::Key(key)), now_ms)
    }

    /// Feed one RFID tag read.
    pub fn handle_tag(&mut self, tag: &str, now_ms: u64) -> UiOutcome {
        let mut id: String<16> = String::new();
        if id.push_str(tag).is_err() || tag.is_empty() {
            return UiOutcome {
                error: Some(InputError::InvalidInput),
                tone: Some(Tone::Reject),
                ..UiOutcome::default()
            };
        }
        self.step(Some(UiInput::TagScanned(id)), now_ms)
    }

    /// The coordinator opened a tap for the pending payment.
    pub fn dispense_started(&mut self, now_ms: u64) -> UiOutcome {
        self.step(Some(UiInput::DispenseStarted), now_ms)
    }

    /// Abandon the current session (payment request could not be sent).
    pub fn cancel(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        self.fsm.force_transition(UiState::HomeIdle, &mut self.ctx);
    }

    /// Periodic step: enforces the session timeout.
    pub fn tick(&mut self, now_ms: u64) -> UiOutcome {
        self.step(None, now_ms)
    }

    fn step(&mut self, input: Option<UiInput>, now_ms: u64) -> UiOutcome {
        self.ctx.now_ms = now_ms;
        self.ctx.input = input;
        self.fsm.tick(&mut self.ctx);
        self.ctx.input = None;
        UiOutcome {
            record: self.ctx.outbox.take(),
            error: self.ctx.rejected.take(),
            tone: self.ctx.tone.take(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> UiState {
        self.fsm.current_state()
    }

    pub fn phone(&self) -> &str {
        &self.ctx.phone
    }

    pub fn amount(&self) -> &str {
        &self.ctx.amount
    }

    pub fn selected_tap(&self) -> Option<usize> {
        self.ctx.selected_tap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionKind;

    const T: u64 = 45_000;

    fn machine() -> PaymentStateMachine {
        PaymentStateMachine::new(&KioskConfig::default())
    }

    fn keys(ui: &mut PaymentStateMachine, s: &str, now: u64) -> UiOutcome {
        let mut last = UiOutcome::default();
        for c in s.chars() {
            last = ui.handle_key(c, now);
        }
        last
    }

    #[test]
    fn starts_in_home_idle() {
        assert_eq!(machine().state(), UiState::HomeIdle);
    }

    #[test]
    fn full_keypad_entry_emits_mobile_money_record() {
        let mut ui = machine();
        ui.handle_key('A', 0);
        assert_eq!(ui.state(), UiState::EnterPhone);
        keys(&mut ui, "0712345678", 10);
        assert_eq!(ui.state(), UiState::EnterAmount);
        keys(&mut ui, "0050", 20);
        assert_eq!(ui.state(), UiState::EnterTap);

        let out = ui.handle_key('2', 30);
        assert_eq!(ui.state(), UiState::WaitingForTapOrKey);
        let rec = out.record.unwrap();
        assert_eq!(rec.kind, TransactionKind::MobileMoneyPay);
        assert_eq!(rec.identity.as_str(), "0712345678");
        assert_eq!(rec.amount, 50);
        assert_eq!(rec.tap, Some(1));
    }

    #[test]
    fn hash_confirms_short_amount() {
        let mut ui = machine();
        keys(&mut ui, "#0712345678", 0);
        keys(&mut ui, "75", 0);
        assert_eq!(ui.state(), UiState::EnterAmount);
        ui.handle_key('#', 0);
        assert_eq!(ui.state(), UiState::EnterTap);
    }

    #[test]
    fn zero_amount_is_refused() {
        let mut ui = machine();
        keys(&mut ui, "A0712345678", 0);
        let out = keys(&mut ui, "0000", 0);
        assert_eq!(out.error, Some(InputError::InvalidInput));
        assert_eq!(ui.state(), UiState::EnterAmount);
        assert_eq!(ui.amount(), "000");
        let out = ui.handle_key('#', 0);
        assert_eq!(out.error, Some(InputError::InvalidInput));
        assert_eq!(ui.state(), UiState::EnterAmount);
    }

    #[test]
    fn non_digit_in_phone_is_ignored() {
        let mut ui = machine();
        keys(&mut ui, "A07", 0);
        let out = ui.handle_key('B', 0);
        assert_eq!(out.error, Some(InputError::InvalidInput));
        assert_eq!(ui.phone(), "07");
        assert_eq!(ui.state(), UiState::EnterPhone);
    }

    #[test]
    fn tap_out_of_range_is_refused() {
        let mut ui = machine();
        keys(&mut ui, "A0712345678", 0);
        keys(&mut ui, "0050", 0);
        for bad in ['0', '5', '9', 'C'] {
            let out = ui.handle_key(bad, 0);
            assert_eq!(out.error, Some(InputError::InvalidInput), "{bad}");
            assert_eq!(ui.state(), UiState::EnterTap);
        }
    }

    #[test]
    fn star_cancels_and_clears_buffers() {
        let mut ui = machine();
        keys(&mut ui, "A0712345678", 0);
        keys(&mut ui, "12", 0);
        ui.handle_key('*', 0);
        assert_eq!(ui.state(), UiState::HomeIdle);
        assert_eq!(ui.phone(), "");
        assert_eq!(ui.amount(), "");
    }

    #[test]
    fn timeout_returns_home_with_cleared_buffers() {
        let mut ui = machine();
        keys(&mut ui, "A0712", 1_000);
        assert!(ui.tick(1_000 + T - 1).error.is_none());
        assert_eq!(ui.state(), UiState::EnterPhone);
        let out = ui.tick(1_000 + T);
        assert_eq!(out.error, Some(InputError::SessionTimeout));
        assert_eq!(ui.state(), UiState::HomeIdle);
        assert_eq!(ui.phone(), "");
    }

    #[test]
    fn timeout_wins_over_late_key() {
        let mut ui = machine();
        ui.handle_key('A', 0);
        let out = ui.handle_key('7', T);
        assert_eq!(out.error, Some(InputError::SessionTimeout));
        assert_eq!(ui.state(), UiState::HomeIdle);
        assert_eq!(ui.phone(), "");
    }

    #[test]
    fn home_idle_never_times_out() {
        let mut ui = machine();
        assert_eq!(ui.tick(10 * T), UiOutcome::default());
        assert_eq!(ui.state(), UiState::HomeIdle);
    }

    #[test]
    fn tag_scan_in_home_emits_card_pay() {
        let mut ui = machine();
        let out = ui.handle_tag("04A1B2C3", 0);
        let rec = out.record.unwrap();
        assert_eq!(rec.kind, TransactionKind::CardPay);
        assert_eq!(rec.identity.as_str(), "04A1B2C3");
        assert_eq!(rec.tap, None);
        assert_eq!(ui.state(), UiState::HomeIdle);
    }

    #[test]
    fn tag_scan_mid_entry_is_refused() {
        let mut ui = machine();
        keys(&mut ui, "A071", 0);
        let out = ui.handle_tag("04A1B2C3", 0);
        assert!(out.record.is_none());
        assert_eq!(out.error, Some(InputError::InvalidInput));
        assert_eq!(ui.state(), UiState::EnterPhone);
        assert_eq!(ui.phone(), "071");
    }

    #[test]
    fn dispense_started_returns_home() {
        let mut ui = machine();
        keys(&mut ui, "A0712345678", 0);
        keys(&mut ui, "00502", 0);
        assert_eq!(ui.state(), UiState::WaitingForTapOrKey);
        ui.dispense_started(5);
        assert_eq!(ui.state(), UiState::HomeIdle);
        assert_eq!(ui.selected_tap(), None);
    }

    #[test]
    fn waiting_returns_home_on_hash() {
        let mut ui = machine();
        keys(&mut ui, "A0712345678", 0);
        keys(&mut ui, "00502", 0);
        ui.handle_key('#', 0);
        assert_eq!(ui.state(), UiState::HomeIdle);
    }

    #[test]
    fn state_from_index_roundtrip() {
        for i in 0..UiState::COUNT {
            assert_eq!(UiState::from_index(i) as usize, i);
        }
    }
}
