//! Unified error types for the WaterKiosk firmware.
//!
//! One small `Copy` enum per subsystem, each convertible into the
//! top-level [`Error`].  None of these are fatal: every failure is either
//! ignored without a state change, retried with backoff, or forces a safe
//! terminal state (valve closed, session idle).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A tap controller operation was rejected.
    Tap(TapError),
    /// The connectivity manager could not carry out a request.
    Link(LinkError),
    /// Keypad or tag input was rejected by the payment state machine.
    Input(InputError),
    /// A transaction could not be resolved into a dispensing command.
    Transaction(TransactionError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tap(e) => write!(f, "tap: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Transaction(e) => write!(f, "transaction: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tap controller errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapError {
    /// Tap index outside `0..NUM_OF_TAPS`.
    InvalidTap,
    /// A dispensing session is already open on this tap.
    AlreadyRunning,
    /// Pause/resume requested in a phase that does not allow it.
    InvalidTransition,
}

impl fmt::Display for TapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTap => write!(f, "invalid tap index"),
            Self::AlreadyRunning => write!(f, "tap already running"),
            Self::InvalidTransition => write!(f, "invalid tap transition"),
        }
    }
}

impl From<TapError> for Error {
    fn from(e: TapError) -> Self {
        Self::Tap(e)
    }
}

// ---------------------------------------------------------------------------
// Connectivity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Publish attempted while the broker session is not up.
    NotConnected,
    /// Outbound queue is full; the caller decides whether to drop.
    QueueFull,
    /// Modem did not answer the AT probe.
    ModemUnresponsive,
    /// Cellular data (GPRS) attach failed.
    DataAttachFailed,
    /// MQTT CONNECT or SUBSCRIBE was refused.
    BrokerRefused,
    /// Transport rejected a publish.
    PublishFailed,
    /// Liveness check of the broker session failed.
    HeartbeatLost,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::QueueFull => write!(f, "outbound queue full"),
            Self::ModemUnresponsive => write!(f, "modem unresponsive"),
            Self::DataAttachFailed => write!(f, "data attach failed"),
            Self::BrokerRefused => write!(f, "broker refused session"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::HeartbeatLost => write!(f, "heartbeat lost"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Payment / UI input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Key or tag not acceptable in the current state (non-digit, full
    /// buffer, tap out of range, zero amount).
    InvalidInput,
    /// The session sat in a non-idle state past the UI timeout.
    SessionTimeout,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::SessionTimeout => write!(f, "session timed out"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Transaction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionError {
    /// Wire string did not match any known transaction layout.
    Malformed,
    /// Card has no credit left.
    NoCredit,
    /// Every tap is busy.
    NoIdleTap,
    /// Amount resolved to zero pulses.
    ZeroAmount,
    /// Card ledger is full.
    LedgerFull,
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed transaction string"),
            Self::NoCredit => write!(f, "no credit on card"),
            Self::NoIdleTap => write!(f, "no idle tap"),
            Self::ZeroAmount => write!(f, "zero amount"),
            Self::LedgerFull => write!(f, "card ledger full"),
        }
    }
}

impl From<TransactionError> for Error {
    fn from(e: TransactionError) -> Self {
        Self::Transaction(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
