//! Application service: the hexagonal core.
//!
//! [`KioskService`] owns the tap controller, payment UI, transaction
//! coordinator and connectivity manager.  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  KioskCommand ─▶│         KioskService          │──▶ EventSink
//!                 │  UI · Coordinator · Taps      │
//!  ActuatorPort ◀─│  Link                         │◀─▶ ModemPort
//!                 └──────────────────────────────┘
//! ```
//!
//! One [`tick`](KioskService::tick) is one control cycle:
//! link → inbound confirmations → UI timeout → taps → receipts → telemetry.

use log::{info, warn};

use crate::config::{KioskConfig, NUM_OF_TAPS};
use crate::error::Error;
use crate::flow::PulseCounter;
use crate::fsm::{PaymentStateMachine, UiOutcome, UiState};
use crate::link::{ConnectivityManager, LinkState};
use crate::tap::{TapController, TapEvent};
use crate::transaction::coordinator::TransactionCoordinator;

use super::commands::KioskCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, EventSink, ModemPort, Tone};

// ───────────────────────────────────────────────────────────────
// KioskService
// ───────────────────────────────────────────────────────────────

pub struct KioskService {
    config: KioskConfig,
    taps: TapController,
    ui: PaymentStateMachine,
    trx: TransactionCoordinator,
    link: ConnectivityManager,
    started_ms: u64,
    last_telemetry_ms: u64,
}

impl KioskService {
    /// Construct the service wired to the flow meter ISR counters.
    ///
    /// Does **not** start the link; call [`start`](Self::start) next.
    pub fn new(config: KioskConfig) -> Self {
        let taps = TapController::with_flow_meters(&config);
        Self::with_taps(config, taps)
    }

    /// Construct the service reading the given pulse counters.
    pub fn with_pulse_counters(
        config: KioskConfig,
        pulses: &'static [PulseCounter; NUM_OF_TAPS],
    ) -> Self {
        let taps = TapController::new(&config, pulses);
        Self::with_taps(config, taps)
    }

    fn with_taps(config: KioskConfig, taps: TapController) -> Self {
        Self {
            ui: PaymentStateMachine::new(&config),
            trx: TransactionCoordinator::new(&config),
            link: ConnectivityManager::new(&config),
            taps,
            config,
            started_ms: 0,
            last_telemetry_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.started_ms = now_ms;
        self.last_telemetry_ms = now_ms;
        self.link.init(now_ms);
        sink.emit(&AppEvent::Started);
        info!("KioskService started, {} taps", NUM_OF_TAPS);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        modem: &mut impl ModemPort,
        sink: &mut impl EventSink,
    ) {
        let prev_ui = self.ui.state();

        // 1. Connectivity: one bring-up step, heartbeat, queue flush
        let prev_link = self.link.state();
        self.link.update(now_ms, modem);
        let new_link = self.link.state();
        if new_link != prev_link {
            sink.emit(&AppEvent::LinkChanged {
                from: prev_link,
                to: new_link,
            });
        }

        // 2. Broker confirmations → tap sessions
        while let Some(msg) = self.link.take_inbound() {
            match self.trx.handle_inbound(&msg.payload, &mut self.taps, &mut self.link) {
                Ok(Some(tap)) => self.on_dispense_authorised(tap, now_ms, sink),
                Ok(None) => {}
                Err(e) => {
                    warn!("Inbound '{}' rejected: {}", msg.payload, e);
                    sink.emit(&AppEvent::TransactionRejected(e));
                }
            }
        }

        // 3. Payment UI timeout
        let outcome = self.ui.tick(now_ms);
        self.apply_ui_outcome(outcome, now_ms, hw, sink);

        // 4. Taps: open pending valves, close at target, pause timeouts
        for event in self.taps.tick(now_ms, hw) {
            self.on_tap_event(event, sink);
        }

        // 5. Periodic telemetry
        let interval_ms = u64::from(self.config.telemetry_interval_secs) * 1_000;
        if now_ms.saturating_sub(self.last_telemetry_ms) >= interval_ms {
            self.last_telemetry_ms = now_ms;
            sink.emit(&AppEvent::Telemetry(self.build_telemetry(now_ms)));
        }

        self.emit_ui_change(prev_ui, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one external command.
    pub fn handle_command(
        &mut self,
        cmd: KioskCommand,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let prev_ui = self.ui.state();
        let result = match cmd {
            KioskCommand::Key(key) => {
                let outcome = self.ui.handle_key(key, now_ms);
                self.apply_ui_outcome(outcome, now_ms, hw, sink);
                Ok(())
            }
            KioskCommand::TagScanned(tag) => {
                let outcome = self.ui.handle_tag(&tag, now_ms);
                self.apply_ui_outcome(outcome, now_ms, hw, sink);
                Ok(())
            }
            KioskCommand::ManualButton(tap) => {
                let phase = self.taps.manual_trigger(tap, now_ms, hw)?;
                info!("TAP{}: button -> {:?}", tap + 1, phase);
                Ok(())
            }
            KioskCommand::PauseTap(tap) => self.taps.pause(tap, now_ms, hw).map_err(Error::from),
            KioskCommand::ResumeTap(tap) => self.taps.resume(tap, hw).map_err(Error::from),
            KioskCommand::AbortTap(tap) => {
                let event = self.taps.abort(tap, hw)?;
                self.on_tap_event(event, sink);
                Ok(())
            }
            KioskCommand::Shutdown => {
                for event in self.taps.abort_all(hw) {
                    self.on_tap_event(event, sink);
                }
                hw.all_off();
                warn!("KioskService shut down, all valves closed");
                Ok(())
            }
        };
        self.emit_ui_change(prev_ui, sink);
        result
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_telemetry(&self, now_ms: u64) -> TelemetryData {
        let mut imei = heapless::String::new();
        let _ = imei.push_str(self.link.imei());
        TelemetryData {
            uptime_secs: now_ms.saturating_sub(self.started_ms) / 1_000,
            ui_state: self.ui.state(),
            link_state: self.link.state(),
            imei,
            taps: self.taps.statuses(),
            active: core::array::from_fn(|i| self.trx.active_kind(i)),
            outbound_queued: self.link.outbound_len(),
        }
    }

    pub fn taps(&self) -> &TapController {
        &self.taps
    }

    pub fn ui(&self) -> &PaymentStateMachine {
        &self.ui
    }

    pub fn link(&self) -> &ConnectivityManager {
        &self.link
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.trx
    }

    pub fn ui_state(&self) -> UiState {
        self.ui.state()
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_ui_outcome(
        &mut self,
        outcome: UiOutcome,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if let Some(err) = outcome.error {
            sink.emit(&AppEvent::InputRejected(err));
        }

        let Some(record) = outcome.record else {
            if let Some(tone) = outcome.tone {
                hw.beep(tone);
            }
            return;
        };

        let (tap, amount) = (record.tap, record.amount);
        match self.trx.submit_local(record, &mut self.taps, &mut self.link) {
            Ok(Some(tap)) => {
                hw.beep(Tone::Accept);
                self.on_dispense_authorised(tap, now_ms, sink);
            }
            Ok(None) => {
                hw.beep(Tone::Accept);
                if let Some(tap) = tap {
                    sink.emit(&AppEvent::PaymentRequested { tap, amount });
                }
            }
            Err(e) => {
                warn!("Payment rejected: {}", e);
                hw.beep(Tone::Reject);
                self.ui.cancel(now_ms);
                sink.emit(&AppEvent::TransactionRejected(e));
            }
        }
    }

    fn on_dispense_authorised(&mut self, tap: usize, now_ms: u64, sink: &mut impl EventSink) {
        if let Some(kind) = self.trx.active_kind(tap) {
            sink.emit(&AppEvent::DispenseAuthorised { tap, kind });
        }
        if self.ui.state() == UiState::WaitingForTapOrKey && self.ui.selected_tap() == Some(tap) {
            self.ui.dispense_started(now_ms);
        }
    }

    fn on_tap_event(&mut self, event: TapEvent, sink: &mut impl EventSink) {
        self.trx.on_tap_event(&event, &mut self.link);
        sink.emit(&AppEvent::Tap(event));
    }

    fn emit_ui_change(&self, prev: UiState, sink: &mut impl EventSink) {
        let now = self.ui.state();
        if now != prev {
            sink.emit(&AppEvent::UiChanged { from: prev, to: now });
        }
    }
}
