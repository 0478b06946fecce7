//! Cellular / MQTT connectivity manager.
//!
//! Brings the link up one phase per control cycle and keeps it up:
//!
//! ```text
//!  DOWN ──[AT ok]──▶ MODEM_UP ──[data attached]──▶ DATA_UP ──[broker session]──▶ CONNECTED
//!    ▲                                                ▲                              │
//!    │                                                └──[heartbeat lost / publish failed]
//!    └──[reset released]── RESETTING ◀──[max_retries soft failures]── (any bring-up phase)
//!                                  ▲
//!                                  └──[max_retries demotions without a live heartbeat]
//! ```
//!
//! ## Reconnection policy
//!
//! A failed bring-up step waits an exponential backoff (`retry_backoff_ms`,
//! doubling per failure, capped at `max_backoff_ms`) before the next
//! attempt.  After `max_retries` consecutive failures the modem is
//! hard-reset through its reset line, held for `reset_hold_ms`.
//!
//! A session that keeps handshaking but never proves itself alive (no
//! heartbeat reply, no inbound traffic, no successful publish) is demoted
//! each time; `max_retries` such demotions in a row also reset the modem.
//!
//! Nothing here sleeps: every wait is a timestamp compared on the next
//! [`update`](ConnectivityManager::update).

use core::fmt::Write as _;

use heapless::{Deque, String};
use log::{info, warn};
use serde::Serialize;

use crate::app::ports::{MAX_PAYLOAD, MAX_TOPIC, ModemPort};
use crate::config::KioskConfig;
use crate::error::LinkError;

/// Depth of the inbound and outbound message queues.
pub const QUEUE_DEPTH: usize = 8;

/// Client id used until the modem reports its IMEI.
const FALLBACK_IDENTITY: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkState {
    Down,
    ModemUp,
    DataUp,
    Connected,
    Resetting,
}

/// Payload received on the kiosk's `rx` topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub payload: String<MAX_PAYLOAD>,
}

/// Payload waiting to be published on the kiosk's `tx` topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub payload: String<MAX_PAYLOAD>,
}

pub struct ConnectivityManager {
    config: KioskConfig,
    state: LinkState,
    /// Consecutive soft failures, `0..max_retries`.
    failures: u8,
    /// Broker sessions dropped since the last proof of life.
    demotions: u8,
    backoff_ms: u64,
    next_attempt_ms: u64,
    last_heartbeat_ms: u64,
    /// Set while the reset line is held.
    reset_release_ms: Option<u64>,
    imei: String<16>,
    tx_topic: String<MAX_TOPIC>,
    rx_topic: String<MAX_TOPIC>,
    inbound: Deque<InboundMessage, QUEUE_DEPTH>,
    outbound: Deque<OutboundMessage, QUEUE_DEPTH>,
}

impl ConnectivityManager {
    pub fn new(config: &KioskConfig) -> Self {
        Self {
            config: config.clone(),
            state: LinkState::Down,
            failures: 0,
            demotions: 0,
            backoff_ms: config.retry_backoff_ms,
            next_attempt_ms: 0,
            last_heartbeat_ms: 0,
            reset_release_ms: None,
            imei: String::new(),
            tx_topic: String::new(),
            rx_topic: String::new(),
            inbound: Deque::new(),
            outbound: Deque::new(),
        }
    }

    /// Start bring-up from scratch.
    pub fn init(&mut self, now_ms: u64) {
        self.state = LinkState::Down;
        self.failures = 0;
        self.demotions = 0;
        self.backoff_ms = self.config.retry_backoff_ms;
        self.next_attempt_ms = now_ms;
        self.last_heartbeat_ms = now_ms;
        self.reset_release_ms = None;
        self.inbound.clear();
        self.outbound.clear();
        info!("LINK: init, bringing up modem");
    }

    // ── Control cycle ─────────────────────────────────────────

    /// Advance the link by at most one phase.
    pub fn update(&mut self, now_ms: u64, modem: &mut impl ModemPort) {
        match self.state {
            LinkState::Down | LinkState::ModemUp | LinkState::DataUp
                if now_ms < self.next_attempt_ms => {}

            LinkState::Down => {
                if modem.probe() {
                    let imei = modem.imei();
                    self.set_identity(imei.as_deref().unwrap_or(FALLBACK_IDENTITY));
                    info!("LINK: modem responsive, IMEI {}", self.imei);
                    self.advance(LinkState::ModemUp, now_ms);
                } else {
                    self.fail(LinkError::ModemUnresponsive, now_ms);
                }
            }

            LinkState::ModemUp => match modem.attach_data(&self.config.apn) {
                Ok(()) => {
                    info!("LINK: data attached on {}", self.config.apn);
                    self.advance(LinkState::DataUp, now_ms);
                }
                Err(e) => self.fail(e, now_ms),
            },

            LinkState::DataUp => {
                let session = modem
                    .connect_broker(&self.config.broker_host, self.config.broker_port, &self.imei)
                    .and_then(|()| modem.subscribe(&self.rx_topic));
                match session {
                    Ok(()) => {
                        info!(
                            "LINK: broker {}:{} connected, subscribed {}",
                            self.config.broker_host, self.config.broker_port, self.rx_topic
                        );
                        self.last_heartbeat_ms = now_ms;
                        self.advance(LinkState::Connected, now_ms);
                    }
                    Err(e) => self.fail(e, now_ms),
                }
            }

            LinkState::Connected => self.service_session(now_ms, modem),

            LinkState::Resetting => match self.reset_release_ms {
                None => {
                    warn!(
                        "LINK: hard reset, holding modem reset for {} ms",
                        self.config.reset_hold_ms
                    );
                    modem.set_reset_line(true);
                    self.reset_release_ms = Some(now_ms.saturating_add(self.config.reset_hold_ms));
                }
                Some(release) if now_ms >= release => {
                    modem.set_reset_line(false);
                    self.reset_release_ms = None;
                    self.state = LinkState::Down;
                    self.next_attempt_ms = now_ms;
                    info!("LINK: reset released");
                }
                Some(_) => {}
            },
        }
    }

    fn service_session(&mut self, now_ms: u64, modem: &mut impl ModemPort) {
        if !modem.broker_connected() {
            self.demote(LinkError::NotConnected, now_ms);
            return;
        }

        while !self.inbound.is_full() {
            let Some(payload) = modem.poll_inbound() else { break };
            self.confirm_heartbeat(now_ms);
            let _ = self.inbound.push_back(InboundMessage { payload });
        }

        if now_ms.saturating_sub(self.last_heartbeat_ms) >= self.config.heartbeat_interval_ms {
            if modem.check_liveness() {
                self.confirm_heartbeat(now_ms);
            } else {
                self.demote(LinkError::HeartbeatLost, now_ms);
                return;
            }
        }

        while let Some(msg) = self.outbound.front() {
            match modem.publish(&self.tx_topic, &msg.payload) {
                Ok(()) => {
                    self.outbound.pop_front();
                    self.demotions = 0;
                }
                Err(e) => {
                    self.demote(e, now_ms);
                    return;
                }
            }
        }
    }

    // ── Transitions ───────────────────────────────────────────

    fn advance(&mut self, to: LinkState, now_ms: u64) {
        self.state = to;
        self.failures = 0;
        self.backoff_ms = self.config.retry_backoff_ms;
        self.next_attempt_ms = now_ms;
    }

    fn fail(&mut self, err: LinkError, now_ms: u64) {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.config.max_retries {
            warn!("LINK: {} in {:?}, {} failures, resetting modem", err, self.state, self.failures);
            self.enter_reset();
            return;
        }
        warn!(
            "LINK: {} in {:?} (failure {}/{}), retry in {} ms",
            err, self.state, self.failures, self.config.max_retries, self.backoff_ms
        );
        self.next_attempt_ms = now_ms.saturating_add(self.backoff_ms);
        self.backoff_ms = self.backoff_ms.saturating_mul(2).min(self.config.max_backoff_ms);
    }

    /// Broker session lost: fall back to `DataUp` and redo the handshake
    /// on the next update.  Does not count as a bring-up failure.
    fn demote(&mut self, err: LinkError, now_ms: u64) {
        self.demotions = self.demotions.saturating_add(1);
        if self.demotions >= self.config.max_retries {
            warn!(
                "LINK: {}, session dropped {} times in a row, resetting modem",
                err, self.demotions
            );
            self.enter_reset();
            return;
        }
        warn!("LINK: {}, reconnecting to broker", err);
        self.state = LinkState::DataUp;
        self.next_attempt_ms = now_ms;
    }

    fn enter_reset(&mut self) {
        self.state = LinkState::Resetting;
        self.failures = 0;
        self.demotions = 0;
        self.backoff_ms = self.config.retry_backoff_ms;
        self.reset_release_ms = None;
    }

    fn set_identity(&mut self, imei: &str) {
        self.imei.clear();
        let _ = self.imei.push_str(imei);
        self.tx_topic.clear();
        self.rx_topic.clear();
        let _ = write!(self.tx_topic, "{}/{}/tx", self.config.topic_prefix, self.imei);
        let _ = write!(self.rx_topic, "{}/{}/rx", self.config.topic_prefix, self.imei);
    }

    // ── Session API ───────────────────────────────────────────

    /// Any proof of a live broker session (inbound traffic, ping reply).
    pub fn confirm_heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
        self.demotions = 0;
    }

    /// Queue a payload for the `tx` topic.
    pub fn publish(&mut self, payload: &str) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        if self.outbound.is_full() {
            return Err(LinkError::QueueFull);
        }
        let mut msg = OutboundMessage { payload: String::new() };
        msg.payload.push_str(payload).map_err(|_| LinkError::PublishFailed)?;
        self.outbound
            .push_back(msg)
            .map_err(|_| LinkError::QueueFull)
    }

    /// Next message received from the broker.
    pub fn take_inbound(&mut self) -> Option<InboundMessage> {
        self.inbound.pop_front()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn failures(&self) -> u8 {
        self.failures
    }

    pub fn imei(&self) -> &str {
        &self.imei
    }

    pub fn tx_topic(&self) -> &str {
        &self.tx_topic
    }

    pub fn rx_topic(&self) -> &str {
        &self.rx_topic
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }
}
