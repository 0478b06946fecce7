//! Cellular modem adapter.
//!
//! Implements [`ModemPort`] for the kiosk's GSM module.  The reset line is
//! a real GPIO (active-low, see [`pins::GSM_RESET_GPIO`]).  The AT command
//! transport sits behind this adapter and is not part of this crate: the
//! session here is a loopback in which published payloads are logged and
//! inbound payloads are injected with [`CellularModem::inject`].  That is
//! enough to run the whole kiosk on the bench and on the host.

use heapless::{Deque, String};
use log::{debug, info, warn};

use crate::app::ports::{MAX_PAYLOAD, ModemPort};
use crate::drivers::hw_init;
use crate::error::LinkError;
use crate::pins;

const INBOX_DEPTH: usize = 8;

pub struct CellularModem {
    imei: String<16>,
    in_reset: bool,
    attached: bool,
    session: bool,
    subscribed: bool,
    inbox: Deque<String<MAX_PAYLOAD>, INBOX_DEPTH>,
    published: u32,
}

impl CellularModem {
    pub fn new(imei: &str) -> Self {
        let mut id = String::new();
        let _ = id.push_str(imei);
        Self {
            imei: id,
            in_reset: false,
            attached: false,
            session: false,
            subscribed: false,
            inbox: Deque::new(),
            published: 0,
        }
    }

    /// Queue a payload as if it had arrived on the subscribed topic.
    /// Returns `false` when the payload is too long or the inbox is full.
    pub fn inject(&mut self, payload: &str) -> bool {
        let mut msg = String::new();
        if msg.push_str(payload).is_err() {
            return false;
        }
        self.inbox.push_back(msg).is_ok()
    }

    /// Simulate the broker closing the session.
    pub fn drop_session(&mut self) {
        self.session = false;
        self.subscribed = false;
    }

    /// Payloads published since power-up.
    pub fn published(&self) -> u32 {
        self.published
    }
}

impl ModemPort for CellularModem {
    fn probe(&mut self) -> bool {
        !self.in_reset
    }

    fn imei(&mut self) -> Option<String<16>> {
        (!self.in_reset && !self.imei.is_empty()).then(|| self.imei.clone())
    }

    fn attach_data(&mut self, apn: &str) -> Result<(), LinkError> {
        if self.in_reset {
            return Err(LinkError::ModemUnresponsive);
        }
        info!("MODEM: data attached on {}", apn);
        self.attached = true;
        Ok(())
    }

    fn connect_broker(&mut self, host: &str, port: u16, client_id: &str) -> Result<(), LinkError> {
        if !self.attached {
            return Err(LinkError::DataAttachFailed);
        }
        info!("MODEM: broker {}:{} as {}", host, port, client_id);
        self.session = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        if !self.session {
            return Err(LinkError::BrokerRefused);
        }
        debug!("MODEM: subscribed {}", topic);
        self.subscribed = true;
        Ok(())
    }

    fn broker_connected(&mut self) -> bool {
        self.session
    }

    fn check_liveness(&mut self) -> bool {
        self.session
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError> {
        if !self.session {
            return Err(LinkError::PublishFailed);
        }
        info!("MODEM: {} <- {}", topic, payload);
        self.published += 1;
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<String<MAX_PAYLOAD>> {
        if !self.subscribed {
            return None;
        }
        self.inbox.pop_front()
    }

    fn set_reset_line(&mut self, asserted: bool) {
        hw_init::gpio_write(pins::GSM_RESET_GPIO, !asserted);
        if asserted {
            warn!("MODEM: reset asserted");
            self.attached = false;
            self.drop_session();
        }
        self.in_reset = asserted;
    }
}
