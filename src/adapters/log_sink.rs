//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A display adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::tap::{AbortReason, TapEvent};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match t.to_json() {
                Ok(json) => info!("TELEM | {}", json),
                Err(e) => warn!("TELEM | encode failed: {}", e),
            },
            AppEvent::Tap(TapEvent::Opened { tap, target_pulses }) => {
                info!("TAP | {} opened, target={} pulses", tap + 1, target_pulses);
            }
            AppEvent::Tap(TapEvent::Completed {
                tap,
                pulses,
                target_pulses,
            }) => {
                info!("TAP | {} completed, {}/{} pulses", tap + 1, pulses, target_pulses);
            }
            AppEvent::Tap(TapEvent::Aborted {
                tap,
                pulses,
                target_pulses,
                reason,
            }) => {
                let why = match reason {
                    AbortReason::PauseTimeout => "pause timeout",
                    AbortReason::Cancelled => "cancelled",
                };
                warn!("TAP | {} aborted ({}), {}/{} pulses", tap + 1, why, pulses, target_pulses);
            }
            AppEvent::UiChanged { from, to } => {
                info!("UI | {:?} -> {:?}", from, to);
            }
            AppEvent::LinkChanged { from, to } => {
                info!("LINK | {:?} -> {:?}", from, to);
            }
            AppEvent::PaymentRequested { tap, amount } => {
                info!("PAY | requested {} for tap {}", amount, tap + 1);
            }
            AppEvent::DispenseAuthorised { tap, kind } => {
                info!("PAY | {} authorised on tap {}", kind.tag(), tap + 1);
            }
            AppEvent::InputRejected(err) => {
                warn!("UI | input rejected: {}", err);
            }
            AppEvent::TransactionRejected(err) => {
                warn!("PAY | rejected: {}", err);
            }
            AppEvent::Started => {
                info!("START | kiosk up");
            }
        }
    }
}
