//! Per-tap phase and its transition table.
//!
//! ```text
//!  IDLE ──[start]──▶ PENDING_OPEN ──[opened]──▶ RUNNING ◀──[resume]──┐
//!    ▲                    │                      │   │               │
//!    │                 [abort]      [target reached] [pause]──▶ PAUSED
//!    │                    │                      │                   │
//!    └────────────────────┴──────────────────────┴──[timeout|abort]──┘
//! ```
//!
//! Every legal move is one row of [`TapPhase::next`]; anything else is
//! rejected by returning `None`.

use serde::Serialize;

/// Lifecycle phase of one tap.  Exactly one holds at any time, so the
/// "pending", "running" and "paused" conditions can never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TapPhase {
    /// Valve closed, no session.
    Idle,
    /// Session requested; valve opens on the next tick.
    PendingOpen,
    /// Valve open, metering.
    Running,
    /// Valve closed mid-session; counter and target retained.
    Paused,
}

/// Inputs that drive a tap between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapInput {
    Start,
    Opened,
    TargetReached,
    Pause,
    Resume,
    PauseTimeout,
    Abort,
}

impl TapPhase {
    /// Transition table.  `None` means the input is illegal in this phase.
    pub const fn next(self, input: TapInput) -> Option<TapPhase> {
        use TapInput as I;
        use TapPhase as P;
        match (self, input) {
            (P::Idle, I::Start) => Some(P::PendingOpen),
            (P::PendingOpen, I::Opened) => Some(P::Running),
            (P::Running, I::TargetReached) => Some(P::Idle),
            (P::Running, I::Pause) => Some(P::Paused),
            (P::Paused, I::Resume) => Some(P::Running),
            (P::Paused, I::PauseTimeout) => Some(P::Idle),
            (P::PendingOpen | P::Running | P::Paused, I::Abort) => Some(P::Idle),
            _ => None,
        }
    }

    /// A dispensing session is open (requested, flowing, or paused).
    pub const fn in_session(self) -> bool {
        !matches!(self, TapPhase::Idle)
    }
}
