//! Concrete UI state handlers and table builder.
//!
//! ```text
//!  HOME_IDLE ──['A'|'#']──▶ ENTER_PHONE ──[10 digits]──▶ ENTER_AMOUNT
//!      ▲  │                                                  │
//!      │  └─[tag scan: emit CardPay]            [4 digits | '#']
//!      │                                                     ▼
//!      ├──['#'|'*'|dispense started]── WAITING ◀──[tap 1..N]── ENTER_TAP
//!      │
//!  Any non-idle state ──['*' | timeout]──▶ HOME_IDLE
//! ```

use log::{info, warn};

use super::context::{UiContext, UiInput};
use super::{StateDescriptor, UiState};
use crate::app::ports::Tone;
use crate::config::{AMOUNT_DIGITS, NUM_OF_TAPS, PHONE_DIGITS};
use crate::error::InputError;
use crate::transaction::{TransactionKind, TransactionRecord};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; UiState::COUNT] {
    [
        StateDescriptor {
            id: UiState::HomeIdle,
            name: "HomeIdle",
            on_enter: Some(home_enter),
            on_exit: None,
            on_update: home_update,
        },
        StateDescriptor {
            id: UiState::EnterPhone,
            name: "EnterPhone",
            on_enter: Some(phone_enter),
            on_exit: None,
            on_update: phone_update,
        },
        StateDescriptor {
            id: UiState::EnterAmount,
            name: "EnterAmount",
            on_enter: None,
            on_exit: None,
            on_update: amount_update,
        },
        StateDescriptor {
            id: UiState::EnterTap,
            name: "EnterTap",
            on_enter: None,
            on_exit: None,
            on_update: tap_update,
        },
        StateDescriptor {
            id: UiState::WaitingForTapOrKey,
            name: "WaitingForTapOrKey",
            on_enter: None,
            on_exit: Some(waiting_exit),
            on_update: waiting_update,
        },
    ]
}

/// Timeout and `'*'` handling shared by every non-idle state.
/// Returns `Some(HomeIdle)` when the session ends here.
fn session_guard(ctx: &mut UiContext) -> Option<UiState> {
    if ctx.timed_out() {
        warn!("UI: session timed out after {} ms", ctx.ms_in_state);
        ctx.reject(InputError::SessionTimeout);
        return Some(UiState::HomeIdle);
    }
    if ctx.input == Some(UiInput::Key('*')) {
        info!("UI: session cancelled");
        ctx.tone = Some(Tone::Reject);
        return Some(UiState::HomeIdle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HOME_IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn home_enter(ctx: &mut UiContext) {
    ctx.clear_session();
}

fn home_update(ctx: &mut UiContext) -> Option<UiState> {
    match ctx.input.take()? {
        UiInput::Key('A' | '#') => {
            ctx.accept();
            Some(UiState::EnterPhone)
        }
        UiInput::TagScanned(tag) => {
            match TransactionRecord::new(TransactionKind::CardPay, &tag, 0) {
                Ok(record) => {
                    info!("UI: card {} presented", tag);
                    ctx.outbox = Some(record);
                    ctx.accept();
                }
                Err(_) => ctx.reject(InputError::InvalidInput),
            }
            None
        }
        UiInput::DispenseStarted => None,
        UiInput::Key(_) => {
            ctx.reject(InputError::InvalidInput);
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENTER_PHONE
// ═══════════════════════════════════════════════════════════════════════════

fn phone_enter(ctx: &mut UiContext) {
    ctx.phone.clear();
    ctx.amount.clear();
}

fn phone_update(ctx: &mut UiContext) -> Option<UiState> {
    if let Some(next) = session_guard(ctx) {
        return Some(next);
    }
    match ctx.input.take()? {
        UiInput::Key(d) if d.is_ascii_digit() => {
            if ctx.phone.push(d).is_err() {
                ctx.reject(InputError::InvalidInput);
                return None;
            }
            ctx.accept();
            (ctx.phone.len() == PHONE_DIGITS).then_some(UiState::EnterAmount)
        }
        _ => {
            ctx.reject(InputError::InvalidInput);
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENTER_AMOUNT
// ═══════════════════════════════════════════════════════════════════════════

fn amount_update(ctx: &mut UiContext) -> Option<UiState> {
    if let Some(next) = session_guard(ctx) {
        return Some(next);
    }
    match ctx.input.take()? {
        UiInput::Key(d) if d.is_ascii_digit() => {
            let completes = ctx.amount.len() + 1 == AMOUNT_DIGITS;
            // A full buffer of zeros is never a valid amount.
            if completes && d == '0' && ctx.amount_units() == 0 {
                ctx.reject(InputError::InvalidInput);
                return None;
            }
            if ctx.amount.push(d).is_err() {
                ctx.reject(InputError::InvalidInput);
                return None;
            }
            ctx.accept();
            completes.then_some(UiState::EnterTap)
        }
        UiInput::Key('#') if ctx.amount_units() > 0 => {
            ctx.accept();
            Some(UiState::EnterTap)
        }
        _ => {
            ctx.reject(InputError::InvalidInput);
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENTER_TAP
// ═══════════════════════════════════════════════════════════════════════════

fn tap_update(ctx: &mut UiContext) -> Option<UiState> {
    if let Some(next) = session_guard(ctx) {
        return Some(next);
    }
    let UiInput::Key(k) = ctx.input.take()? else {
        ctx.reject(InputError::InvalidInput);
        return None;
    };
    let tap = match k.to_digit(10) {
        Some(n @ 1..) if n as usize <= NUM_OF_TAPS => n as usize - 1,
        _ => {
            ctx.reject(InputError::InvalidInput);
            return None;
        }
    };

    let record =
        TransactionRecord::new(TransactionKind::MobileMoneyPay, &ctx.phone, ctx.amount_units())
            .map(|r| r.with_tap(tap));
    match record {
        Ok(record) => {
            info!(
                "UI: payment entered, {} units on tap {} from {}",
                record.amount,
                tap + 1,
                record.identity
            );
            ctx.selected_tap = Some(tap);
            ctx.outbox = Some(record);
            ctx.accept();
            Some(UiState::WaitingForTapOrKey)
        }
        Err(_) => {
            ctx.reject(InputError::InvalidInput);
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING_FOR_TAP_OR_KEY: payment request sent, awaiting confirmation
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_update(ctx: &mut UiContext) -> Option<UiState> {
    if let Some(next) = session_guard(ctx) {
        return Some(next);
    }
    match ctx.input.take()? {
        UiInput::Key('#') | UiInput::DispenseStarted => Some(UiState::HomeIdle),
        _ => {
            ctx.reject(InputError::InvalidInput);
            None
        }
    }
}

fn waiting_exit(ctx: &mut UiContext) {
    ctx.selected_tap = None;
}
