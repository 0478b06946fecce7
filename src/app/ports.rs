//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ KioskService (domain)
//! ```
//!
//! Driven adapters (valves, indicators, buzzer, cellular modem, event
//! sinks) implement these traits.  The [`KioskService`](super::service::KioskService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use heapless::String;

use crate::error::LinkError;

/// Largest broker payload the kiosk accepts or produces.
pub const MAX_PAYLOAD: usize = 128;

/// Largest MQTT topic the kiosk builds.
pub const MAX_TOPIC: usize = 64;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Buzzer feedback tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Input accepted.
    Accept,
    /// Input rejected or session cancelled.
    Reject,
}

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Drive tap `tap`'s motor valve open.
    fn open_valve(&mut self, tap: usize);

    /// Drive tap `tap`'s motor valve closed.
    fn close_valve(&mut self, tap: usize);

    /// Switch tap `tap`'s indicator LED.
    fn set_indicator(&mut self, tap: usize, on: bool);

    /// Short buzzer chirp.
    fn beep(&mut self, tone: Tone);

    /// Close every valve and darken every indicator (safe shutdown).
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Modem port (driven adapter: domain ↔ cellular modem + MQTT client)
// ───────────────────────────────────────────────────────────────

/// Cellular modem and MQTT transport.
///
/// Every method must return promptly: long AT exchanges are the adapter's
/// problem and must be split across calls.  The connectivity manager calls
/// at most one bring-up step per control cycle.
pub trait ModemPort {
    /// AT probe: does the modem answer?
    fn probe(&mut self) -> bool;

    /// Modem IMEI, once the modem answers.
    fn imei(&mut self) -> Option<String<16>>;

    /// Attach cellular data on `apn`.
    fn attach_data(&mut self, apn: &str) -> Result<(), LinkError>;

    /// Open the MQTT session.
    fn connect_broker(&mut self, host: &str, port: u16, client_id: &str) -> Result<(), LinkError>;

    /// Subscribe to an inbound topic on the open session.
    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError>;

    /// Transport still believes the broker session is open.
    fn broker_connected(&mut self) -> bool;

    /// Active liveness probe (MQTT ping).  `true` on a confirmed reply.
    fn check_liveness(&mut self) -> bool;

    /// Publish one payload.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError>;

    /// Next payload received on a subscribed topic, if any.
    fn poll_inbound(&mut self) -> Option<String<MAX_PAYLOAD>>;

    /// Drive the modem reset line (`true` = held in reset).
    fn set_reset_line(&mut self, asserted: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, LCD,
/// telemetry).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
