//! Card credit ledger.
//!
//! Top-ups arrive from the broker as `cardtopup` confirmations; tag scans
//! spend from the balance.  Fixed capacity, no heap.

use heapless::{FnvIndexMap, String};

use super::MAX_IDENTITY;
use crate::error::TransactionError;

/// Distinct cards the kiosk remembers (power of two).
pub const LEDGER_CAPACITY: usize = 16;

#[derive(Debug, Default)]
pub struct CardLedger {
    credits: FnvIndexMap<String<MAX_IDENTITY>, u32, LEDGER_CAPACITY>,
}

impl CardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `units` to `tag`'s balance.  Returns the new balance.
    pub fn credit(&mut self, tag: &str, units: u32) -> Result<u32, TransactionError> {
        let key = key(tag)?;
        let balance = self.credits.get(&key).copied().unwrap_or(0).saturating_add(units);
        self.credits
            .insert(key, balance)
            .map_err(|_| TransactionError::LedgerFull)?;
        Ok(balance)
    }

    pub fn balance(&self, tag: &str) -> u32 {
        key(tag)
            .ok()
            .and_then(|k| self.credits.get(&k).copied())
            .unwrap_or(0)
    }

    /// Spend up to `max_units` from `tag`.  Returns the units spent.
    pub fn debit_up_to(&mut self, tag: &str, max_units: u32) -> Result<u32, TransactionError> {
        let key = key(tag)?;
        let balance = self.credits.get_mut(&key).ok_or(TransactionError::NoCredit)?;
        let spent = (*balance).min(max_units);
        if spent == 0 {
            return Err(TransactionError::NoCredit);
        }
        *balance -= spent;
        if *balance == 0 {
            self.credits.remove(&key);
        }
        Ok(spent)
    }

    pub fn len(&self) -> usize {
        self.credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

fn key(tag: &str) -> Result<String<MAX_IDENTITY>, TransactionError> {
    String::try_from(tag).map_err(|_| TransactionError::Malformed)
}
