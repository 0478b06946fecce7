//! Transaction coordinator.
//!
//! Turns payment records into tap sessions and tap outcomes into receipts:
//!
//! ```text
//!   keypad ──mpesapay request──▶ broker ──mpesapay confirm──▶ request_start
//!   broker ──remotedispense────────────────────────────────▶ request_start
//!   broker ──cardtopup──▶ ledger ◀──tag scan──▶ request_start + cardpay receipt
//!   tap Completed / Aborted ──▶ receipt (best effort)
//!   confirmation for a busy tap ──▶ `_0_cancelled` receipt (best effort)
//! ```
//!
//! Publishing is best effort throughout: a receipt that cannot be queued is
//! logged and dropped, the valve has already closed.

use heapless::String;
use log::{info, warn};

use super::ledger::CardLedger;
use super::{Outcome, TransactionKind, TransactionRecord};
use crate::app::ports::MAX_PAYLOAD;
use crate::config::{KioskConfig, NUM_OF_TAPS};
use crate::error::{Error, TapError, TransactionError};
use crate::link::ConnectivityManager;
use crate::tap::{AbortReason, TapController, TapEvent};

pub struct TransactionCoordinator {
    pulses_per_unit: u32,
    card_dispense_units: u32,
    ledger: CardLedger,
    /// Record that opened each tap's current session.
    active: [Option<TransactionRecord>; NUM_OF_TAPS],
}

impl TransactionCoordinator {
    pub fn new(config: &KioskConfig) -> Self {
        Self {
            pulses_per_unit: config.pulses_per_unit,
            card_dispense_units: config.card_dispense_units,
            ledger: CardLedger::new(),
            active: Default::default(),
        }
    }

    /// Pulse target for `units` of volume.
    pub fn target_pulses(&self, units: u32) -> u32 {
        units.saturating_mul(self.pulses_per_unit)
    }

    // ── Local input (keypad / RFID) ───────────────────────────

    /// Handle a record produced by the payment UI.  Returns the tap opened,
    /// if any.
    pub fn submit_local(
        &mut self,
        record: TransactionRecord,
        taps: &mut TapController,
        link: &mut ConnectivityManager,
    ) -> Result<Option<usize>, Error> {
        match record.kind {
            TransactionKind::MobileMoneyPay => {
                if record.amount == 0 {
                    return Err(TransactionError::ZeroAmount.into());
                }
                let tap = record.tap.ok_or(TransactionError::Malformed)?;
                if taps.phase(tap)?.in_session() {
                    return Err(TapError::AlreadyRunning.into());
                }
                let wire = record.encode()?;
                link.publish(&wire)?;
                info!("TRX: payment request queued: {}", wire);
                Ok(None)
            }
            TransactionKind::CardPay => self.card_pay(record, taps, link).map(Some),
            TransactionKind::CardTopup | TransactionKind::RemoteDispense => {
                Err(TransactionError::Malformed.into())
            }
        }
    }

    fn card_pay(
        &mut self,
        mut record: TransactionRecord,
        taps: &mut TapController,
        link: &mut ConnectivityManager,
    ) -> Result<usize, Error> {
        let tag = record.identity.clone();
        if self.ledger.balance(&tag) == 0 {
            return Err(TransactionError::NoCredit.into());
        }
        let tap = taps.first_idle().ok_or(TransactionError::NoIdleTap)?;
        let units = self.ledger.balance(&tag).min(self.card_dispense_units);

        record.amount = units;
        record.tap = Some(tap);
        self.dispatch(record, taps)?;
        self.ledger.debit_up_to(&tag, units)?;
        info!(
            "TRX: card {} dispensing {} units on tap {}, {} left",
            tag,
            units,
            tap + 1,
            self.ledger.balance(&tag)
        );

        if let Some(rec) = &self.active[tap] {
            self.publish_best_effort(rec.encode(), link);
        }
        Ok(tap)
    }

    // ── Broker input ──────────────────────────────────────────

    /// Handle one payload from the broker.  Returns the tap opened, if any.
    ///
    /// A well-formed dispense that cannot start is answered with a
    /// `_0_cancelled` receipt.
    pub fn handle_inbound(
        &mut self,
        payload: &str,
        taps: &mut TapController,
        link: &mut ConnectivityManager,
    ) -> Result<Option<usize>, Error> {
        let record = TransactionRecord::parse(payload)?;
        match record.kind {
            TransactionKind::MobileMoneyPay | TransactionKind::RemoteDispense => {
                let tap = record.tap.ok_or(TransactionError::Malformed)?;
                if let Err(e) = self.dispatch(record.clone(), taps) {
                    self.publish_best_effort(record.encode_receipt(0, Outcome::Cancelled), link);
                    return Err(e);
                }
                Ok(Some(tap))
            }
            TransactionKind::CardTopup => {
                let balance = self.ledger.credit(&record.identity, record.amount)?;
                info!("TRX: card {} topped up to {} units", record.identity, balance);
                Ok(None)
            }
            TransactionKind::CardPay => Err(TransactionError::Malformed.into()),
        }
    }

    fn dispatch(
        &mut self,
        mut record: TransactionRecord,
        taps: &mut TapController,
    ) -> Result<(), Error> {
        let tap = record.tap.ok_or(TransactionError::Malformed)?;
        if record.amount == 0 {
            return Err(TransactionError::ZeroAmount.into());
        }
        let target = self.target_pulses(record.amount);
        taps.request_start(tap, target)?;
        record.target_pulses = Some(target);
        info!(
            "TRX: {} on tap {}, {} units = {} pulses",
            record.kind.tag(),
            tap + 1,
            record.amount,
            target
        );
        self.active[tap] = Some(record);
        Ok(())
    }

    // ── Tap outcomes ──────────────────────────────────────────

    /// Publish a receipt for a finished session.
    pub fn on_tap_event(&mut self, event: &TapEvent, link: &mut ConnectivityManager) {
        let (tap, pulses, outcome) = match *event {
            TapEvent::Opened { .. } => return,
            TapEvent::Completed { tap, pulses, .. } => (tap, pulses, Outcome::Done),
            TapEvent::Aborted { tap, pulses, reason, .. } => (
                tap,
                pulses,
                match reason {
                    AbortReason::PauseTimeout => Outcome::Timeout,
                    AbortReason::Cancelled => Outcome::Cancelled,
                },
            ),
        };
        let Some(record) = self.active.get_mut(tap).and_then(Option::take) else {
            warn!("TRX: tap {} finished with no transaction on record", tap + 1);
            return;
        };
        self.publish_best_effort(record.encode_receipt(pulses, outcome), link);
    }

    fn publish_best_effort(
        &self,
        wire: Result<String<MAX_PAYLOAD>, TransactionError>,
        link: &mut ConnectivityManager,
    ) {
        match wire {
            Ok(wire) => match link.publish(&wire) {
                Ok(()) => info!("TRX: receipt queued: {}", wire),
                Err(e) => warn!("TRX: receipt not sent ({}): {}", e, wire),
            },
            Err(e) => warn!("TRX: receipt not encoded: {}", e),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Payment kind that opened `tap`'s current session.
    pub fn active_kind(&self, tap: usize) -> Option<TransactionKind> {
        self.active.get(tap)?.as_ref().map(|r| r.kind)
    }

    pub fn ledger(&self) -> &CardLedger {
        &self.ledger
    }
}
