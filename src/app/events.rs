//! Outbound application events.
//!
//! The [`KioskService`](super::service::KioskService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use heapless::String;
use serde::Serialize;

use crate::config::NUM_OF_TAPS;
use crate::error::{Error, InputError};
use crate::fsm::UiState;
use crate::link::LinkState;
use crate::tap::{TapEvent, TapStatus};
use crate::transaction::TransactionKind;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started.
    Started,

    /// The payment UI moved between states.
    UiChanged { from: UiState, to: UiState },

    /// The connectivity manager moved between states.
    LinkChanged { from: LinkState, to: LinkState },

    /// A keypad payment request was queued for the broker.
    PaymentRequested { tap: usize, amount: u32 },

    /// A payment was resolved and a tap session requested.
    DispenseAuthorised { tap: usize, kind: TransactionKind },

    /// A tap session opened, completed, or aborted.
    Tap(TapEvent),

    /// Keypad / RFID input was refused.
    InputRejected(InputError),

    /// A payment could not be turned into a dispense.
    TransactionRejected(Error),

    /// Periodic snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryData {
    pub uptime_secs: u64,
    pub ui_state: UiState,
    pub link_state: LinkState,
    pub imei: String<16>,
    pub taps: [TapStatus; NUM_OF_TAPS],
    /// Payment kind behind each tap's open session.
    pub active: [Option<TransactionKind>; NUM_OF_TAPS],
    pub outbound_queued: usize,
}

impl TelemetryData {
    /// JSON rendering for log lines and remote dashboards.
    pub fn to_json(&self) -> Result<std::string::String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
