//! Mock adapters for integration tests.
//!
//! Records every actuator call, modem interaction and emitted event so
//! tests can assert on the full history without touching GPIO or a modem.

use std::collections::VecDeque;

use heapless::String;
use waterkiosk::app::events::AppEvent;
use waterkiosk::app::ports::{ActuatorPort, EventSink, MAX_PAYLOAD, ModemPort, Tone};
use waterkiosk::app::service::KioskService;
use waterkiosk::config::{KioskConfig, NUM_OF_TAPS};
use waterkiosk::error::LinkError;
use waterkiosk::flow::PulseCounter;
use waterkiosk::link::LinkState;
use waterkiosk::tap::TapEvent;

pub const IMEI: &str = "356938035643809";
pub const CYCLE_MS: u64 = 50;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    OpenValve(usize),
    CloseValve(usize),
    Indicator(usize, bool),
    Beep(Tone),
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last commanded valve position for `tap`.
    pub fn valve_open(&self, tap: usize) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::OpenValve(t) if t == tap => Some(true),
                ActuatorCall::CloseValve(t) if t == tap => Some(false),
                ActuatorCall::AllOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn indicator_on(&self, tap: usize) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::Indicator(t, on) if t == tap => Some(on),
                ActuatorCall::AllOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn beeps(&self) -> Vec<Tone> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                ActuatorCall::Beep(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

impl ActuatorPort for MockHardware {
    fn open_valve(&mut self, tap: usize) {
        self.calls.push(ActuatorCall::OpenValve(tap));
    }

    fn close_valve(&mut self, tap: usize) {
        self.calls.push(ActuatorCall::CloseValve(tap));
    }

    fn set_indicator(&mut self, tap: usize, on: bool) {
        self.calls.push(ActuatorCall::Indicator(tap, on));
    }

    fn beep(&mut self, tone: Tone) {
        self.calls.push(ActuatorCall::Beep(tone));
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }
}

// ── ScriptedModem ─────────────────────────────────────────────

/// Modem whose every answer is a public knob.
#[allow(dead_code)]
pub struct ScriptedModem {
    pub responsive: bool,
    pub attach_ok: bool,
    pub broker_ok: bool,
    pub session_alive: bool,
    pub liveness_ok: bool,
    pub publish_ok: bool,
    pub inbox: VecDeque<&'static str>,
    pub published: Vec<(std::string::String, std::string::String)>,
    pub reset_line: Vec<bool>,
    pub connects: u32,
    pub probes: u32,
}

#[allow(dead_code)]
impl ScriptedModem {
    pub fn healthy() -> Self {
        Self {
            responsive: true,
            attach_ok: true,
            broker_ok: true,
            session_alive: true,
            liveness_ok: true,
            publish_ok: true,
            inbox: VecDeque::new(),
            published: Vec::new(),
            reset_line: Vec::new(),
            connects: 0,
            probes: 0,
        }
    }

    pub fn payloads(&self) -> Vec<&str> {
        self.published.iter().map(|(_, p)| p.as_str()).collect()
    }
}

impl ModemPort for ScriptedModem {
    fn probe(&mut self) -> bool {
        self.probes += 1;
        self.responsive
    }

    fn imei(&mut self) -> Option<String<16>> {
        let mut s = String::new();
        s.push_str(IMEI).ok()?;
        Some(s)
    }

    fn attach_data(&mut self, _apn: &str) -> Result<(), LinkError> {
        if self.attach_ok { Ok(()) } else { Err(LinkError::DataAttachFailed) }
    }

    fn connect_broker(
        &mut self,
        _host: &str,
        _port: u16,
        _client_id: &str,
    ) -> Result<(), LinkError> {
        self.connects += 1;
        if self.broker_ok {
            self.session_alive = true;
            Ok(())
        } else {
            Err(LinkError::BrokerRefused)
        }
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), LinkError> {
        Ok(())
    }

    fn broker_connected(&mut self) -> bool {
        self.session_alive
    }

    fn check_liveness(&mut self) -> bool {
        self.liveness_ok
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError> {
        if !self.publish_ok {
            return Err(LinkError::PublishFailed);
        }
        self.published.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<String<MAX_PAYLOAD>> {
        let next = self.inbox.pop_front()?;
        let mut s = String::new();
        s.push_str(next).ok()?;
        Some(s)
    }

    fn set_reset_line(&mut self, asserted: bool) {
        self.reset_line.push(asserted);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn tap_events(&self) -> Vec<TapEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Tap(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.tap_events()
            .iter()
            .filter(|e| matches!(e, TapEvent::Completed { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Kiosk harness ─────────────────────────────────────────────

/// Service plus mocks plus a private set of pulse counters.
pub struct Kiosk {
    pub app: KioskService,
    pub hw: MockHardware,
    pub modem: ScriptedModem,
    pub sink: RecordingSink,
    pub pulses: &'static [PulseCounter; NUM_OF_TAPS],
    pub now: u64,
}

#[allow(dead_code)]
impl Kiosk {
    pub fn new(config: KioskConfig) -> Self {
        let pulses: &'static [PulseCounter; NUM_OF_TAPS] =
            Box::leak(Box::new([const { PulseCounter::new() }; NUM_OF_TAPS]));
        let mut k = Self {
            app: KioskService::with_pulse_counters(config, pulses),
            hw: MockHardware::new(),
            modem: ScriptedModem::healthy(),
            sink: RecordingSink::default(),
            pulses,
            now: 1_000,
        };
        k.app.start(k.now, &mut k.sink);
        k
    }

    /// Started and brought up to `Connected`.
    pub fn connected() -> Self {
        let mut k = Self::new(KioskConfig::default());
        for _ in 0..3 {
            k.tick();
        }
        assert_eq!(k.app.link_state(), LinkState::Connected);
        k
    }

    pub fn tick(&mut self) {
        self.now += CYCLE_MS;
        self.app.tick(self.now, &mut self.hw, &mut self.modem, &mut self.sink);
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    pub fn keys(&mut self, keys: &str) {
        for c in keys.chars() {
            let _ = self.app.handle_command(
                waterkiosk::app::commands::KioskCommand::Key(c),
                self.now,
                &mut self.hw,
                &mut self.sink,
            );
        }
    }

    pub fn pour(&mut self, tap: usize, pulses: u32) {
        for _ in 0..pulses {
            self.pulses[tap].increment();
        }
    }
}
