//! Transaction records and their broker wire format.
//!
//! Wire strings are `_`-delimited token sequences led by a kind tag.
//! Tap numbers on the wire are 1-based; in memory they are indices.
//!
//! ```text
//!   cardpay_<tag>_<units>_<tap>
//!   cardtopup_<tag>_<credit>
//!   mpesapay_<phone>_<amount>_<tap>
//!   remotedispense_<tap>_<amount>
//! ```
//!
//! Receipts append `_<pulses>_<outcome>` to the record that opened the tap.

pub mod coordinator;
pub mod ledger;

use core::fmt::{self, Write as _};

use heapless::String;
use serde::Serialize;

use crate::app::ports::MAX_PAYLOAD;
use crate::config::{NUM_OF_TAPS, PHONE_DIGITS};
use crate::error::TransactionError;

/// Wire delimiter between tokens.
pub const DELIMITER: char = '_';

/// Longest payer / tag identity carried in a record.
pub const MAX_IDENTITY: usize = 16;

/// Identity placed in remote-dispense records.
const REMOTE_IDENTITY: &str = "remote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionKind {
    CardPay,
    CardTopup,
    MobileMoneyPay,
    RemoteDispense,
}

impl TransactionKind {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::CardPay => "cardpay",
            Self::CardTopup => "cardtopup",
            Self::MobileMoneyPay => "mpesapay",
            Self::RemoteDispense => "remotedispense",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "cardpay" => Some(Self::CardPay),
            "cardtopup" => Some(Self::CardTopup),
            "mpesapay" => Some(Self::MobileMoneyPay),
            "remotedispense" => Some(Self::RemoteDispense),
            _ => None,
        }
    }
}

/// How a dispensing session ended, as reported in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Done,
    Timeout,
    Cancelled,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One payment or dispense request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    /// Phone number, card tag or `remote`.
    pub identity: String<MAX_IDENTITY>,
    /// Volume units paid for, or card credit for a top-up.
    pub amount: u32,
    /// Tap index, once resolved.
    pub tap: Option<usize>,
    /// Pulse target, once resolved.
    pub target_pulses: Option<u32>,
}

impl TransactionRecord {
    pub fn new(
        kind: TransactionKind,
        identity: &str,
        amount: u32,
    ) -> Result<Self, TransactionError> {
        let mut id = String::new();
        id.push_str(identity).map_err(|_| TransactionError::Malformed)?;
        Ok(Self {
            kind,
            identity: id,
            amount,
            tap: None,
            target_pulses: None,
        })
    }

    pub fn with_tap(mut self, tap: usize) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Render the record's wire string.
    pub fn encode(&self) -> Result<String<MAX_PAYLOAD>, TransactionError> {
        let mut out = String::new();
        write!(out, "{self}").map_err(|_| TransactionError::Malformed)?;
        Ok(out)
    }

    /// Render a receipt: the record followed by metered pulses and outcome.
    pub fn encode_receipt(
        &self,
        pulses: u32,
        outcome: Outcome,
    ) -> Result<String<MAX_PAYLOAD>, TransactionError> {
        let mut out = self.encode()?;
        write!(out, "{DELIMITER}{pulses}{DELIMITER}{}", outcome.as_str())
            .map_err(|_| TransactionError::Malformed)?;
        Ok(out)
    }

    /// Parse one wire string.
    pub fn parse(wire: &str) -> Result<Self, TransactionError> {
        let mut tokens = wire.trim().split(DELIMITER);
        let kind = tokens
            .next()
            .and_then(TransactionKind::from_tag)
            .ok_or(TransactionError::Malformed)?;
        let mut field = || tokens.next().ok_or(TransactionError::Malformed);

        let record = match kind {
            TransactionKind::CardPay => {
                let tag = card_tag(field()?)?;
                let units = number(field()?)?;
                let tap = tap_index(field()?)?;
                Self::new(kind, tag, units)?.with_tap(tap)
            }
            TransactionKind::CardTopup => {
                let tag = card_tag(field()?)?;
                let credit = number(field()?)?;
                Self::new(kind, tag, credit)?
            }
            TransactionKind::MobileMoneyPay => {
                let phone = phone(field()?)?;
                let amount = number(field()?)?;
                let tap = tap_index(field()?)?;
                Self::new(kind, phone, amount)?.with_tap(tap)
            }
            TransactionKind::RemoteDispense => {
                let tap = tap_index(field()?)?;
                let amount = number(field()?)?;
                Self::new(kind, REMOTE_IDENTITY, amount)?.with_tap(tap)
            }
        };

        if tokens.next().is_some() {
            return Err(TransactionError::Malformed);
        }
        Ok(record)
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = DELIMITER;
        let tag = self.kind.tag();
        let tap = self.tap.map_or(0, |t| t + 1);
        match self.kind {
            TransactionKind::CardPay => {
                write!(f, "{tag}{d}{}{d}{}{d}{tap}", self.identity, self.amount)
            }
            TransactionKind::CardTopup => write!(f, "{tag}{d}{}{d}{}", self.identity, self.amount),
            TransactionKind::MobileMoneyPay => {
                write!(f, "{tag}{d}{}{d}{:04}{d}{tap}", self.identity, self.amount)
            }
            TransactionKind::RemoteDispense => write!(f, "{tag}{d}{tap}{d}{}", self.amount),
        }
    }
}

// ── Token validation ──────────────────────────────────────────

fn number(tok: &str) -> Result<u32, TransactionError> {
    if tok.is_empty() || !tok.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TransactionError::Malformed);
    }
    tok.parse().map_err(|_| TransactionError::Malformed)
}

fn tap_index(tok: &str) -> Result<usize, TransactionError> {
    match number(tok)? as usize {
        n @ 1..=NUM_OF_TAPS => Ok(n - 1),
        _ => Err(TransactionError::Malformed),
    }
}

fn phone(tok: &str) -> Result<&str, TransactionError> {
    if tok.is_empty() || tok.len() > PHONE_DIGITS || !tok.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TransactionError::Malformed);
    }
    Ok(tok)
}

fn card_tag(tok: &str) -> Result<&str, TransactionError> {
    if tok.is_empty()
        || tok.len() > MAX_IDENTITY
        || !tok.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return Err(TransactionError::Malformed);
    }
    Ok(tok)
}
