//! Tap controller: per-tap valve state machine and flow metering.
//!
//! The controller owns one [`Tap`] per valve.  A session starts with
//! [`TapController::request_start`], opens on the next [`tick`], and ends
//! when the tap's pulse count reaches its target (complete) or when a paused
//! tap outlives the pause timeout (aborted).  Both terminal paths close the
//! valve before the tap returns to `Idle`.
//!
//! Pulse counts are never stored here: each tap borrows its
//! [`PulseCounter`], which the flow meter ISR increments asynchronously.
//!
//! [`tick`]: TapController::tick

pub mod phase;

use log::{info, warn};
use serde::Serialize;

use crate::app::ports::ActuatorPort;
use crate::config::{KioskConfig, NUM_OF_TAPS};
use crate::error::TapError;
use crate::flow::{FLOW_PULSES, PulseCounter};
use crate::pins::{TAP_PINS, TapPins};

pub use phase::{TapInput, TapPhase};

/// Why a session ended without reaching its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbortReason {
    /// Paused longer than the pause timeout.
    PauseTimeout,
    /// Explicitly aborted (shutdown, operator).
    Cancelled,
}

/// Session lifecycle notifications produced by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapEvent {
    Opened { tap: usize, target_pulses: u32 },
    Completed { tap: usize, pulses: u32, target_pulses: u32 },
    Aborted { tap: usize, pulses: u32, target_pulses: u32, reason: AbortReason },
}

/// Events from one [`TapController::tick`]; at most open + close per tap.
pub type TapEvents = heapless::Vec<TapEvent, { 2 * NUM_OF_TAPS }>;

/// Point-in-time view of one tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TapStatus {
    pub phase: TapPhase,
    pub pulses: u32,
    pub target_pulses: u32,
    pub manual_trigger_active: bool,
}

/// One physical tap.
pub struct Tap {
    pins: TapPins,
    phase: TapPhase,
    /// The current pause came from the tap's own push-button.
    manual_trigger_active: bool,
    target_pulses: u32,
    pause_started_ms: u64,
    /// Last level written to the indicator.
    indicator_on: bool,
    pulses: &'static PulseCounter,
}

impl Tap {
    fn new(pins: TapPins, pulses: &'static PulseCounter) -> Self {
        Self {
            pins,
            phase: TapPhase::Idle,
            manual_trigger_active: false,
            target_pulses: 0,
            pause_started_ms: 0,
            indicator_on: false,
            pulses,
        }
    }

    fn apply(&mut self, input: TapInput) -> Result<TapPhase, TapError> {
        let next = self.phase.next(input).ok_or(TapError::InvalidTransition)?;
        self.phase = next;
        Ok(next)
    }

    fn end_session(&mut self) {
        self.manual_trigger_active = false;
    }
}

/// Owns every tap and drives them once per control cycle.
pub struct TapController {
    taps: [Tap; NUM_OF_TAPS],
    pause_timeout_ms: u64,
}

impl TapController {
    /// Build a controller whose taps read `pulses`.
    pub fn new(config: &KioskConfig, pulses: &'static [PulseCounter; NUM_OF_TAPS]) -> Self {
        Self {
            taps: core::array::from_fn(|i| Tap::new(TAP_PINS[i], &pulses[i])),
            pause_timeout_ms: config.pause_timeout_ms,
        }
    }

    /// Build a controller wired to the flow meter ISR counters.
    pub fn with_flow_meters(config: &KioskConfig) -> Self {
        Self::new(config, &FLOW_PULSES)
    }

    // ── Operations ────────────────────────────────────────────

    /// Begin a dispensing session.  The valve opens on the next tick.
    pub fn request_start(&mut self, tap: usize, target_pulses: u32) -> Result<(), TapError> {
        let t = self.tap_mut(tap)?;
        if t.phase.in_session() {
            return Err(TapError::AlreadyRunning);
        }
        t.apply(TapInput::Start)?;
        t.target_pulses = target_pulses;
        t.manual_trigger_active = false;
        t.pulses.clear();
        info!("TAP{}: start requested, target {} pulses", tap + 1, target_pulses);
        Ok(())
    }

    /// Run one control cycle for every tap.
    pub fn tick(&mut self, now_ms: u64, hw: &mut impl ActuatorPort) -> TapEvents {
        let mut events = TapEvents::new();
        let pause_timeout_ms = self.pause_timeout_ms;

        for (i, t) in self.taps.iter_mut().enumerate() {
            if t.phase == TapPhase::PendingOpen {
                hw.open_valve(i);
                if t.apply(TapInput::Opened).is_ok() {
                    info!(
                        "TAP{}: valve open (motor gpio {}, meter gpio {})",
                        i + 1,
                        t.pins.motor_open,
                        t.pins.flowmeter
                    );
                    let _ = events.push(TapEvent::Opened {
                        tap: i,
                        target_pulses: t.target_pulses,
                    });
                }
            }

            match t.phase {
                TapPhase::Running => {
                    let pulses = t.pulses.read();
                    if pulses >= t.target_pulses {
                        hw.close_valve(i);
                        if t.apply(TapInput::TargetReached).is_ok() {
                            t.end_session();
                            info!("TAP{}: complete, {}/{} pulses", i + 1, pulses, t.target_pulses);
                            let _ = events.push(TapEvent::Completed {
                                tap: i,
                                pulses,
                                target_pulses: t.target_pulses,
                            });
                        }
                    }
                }
                TapPhase::Paused => {
                    if now_ms.saturating_sub(t.pause_started_ms) >= pause_timeout_ms {
                        hw.close_valve(i);
                        if t.apply(TapInput::PauseTimeout).is_ok() {
                            t.end_session();
                            let pulses = t.pulses.read();
                            warn!(
                                "TAP{}: paused for {} ms, aborting at {}/{} pulses",
                                i + 1,
                                pause_timeout_ms,
                                pulses,
                                t.target_pulses
                            );
                            let _ = events.push(TapEvent::Aborted {
                                tap: i,
                                pulses,
                                target_pulses: t.target_pulses,
                                reason: AbortReason::PauseTimeout,
                            });
                        }
                    }
                }
                TapPhase::Idle | TapPhase::PendingOpen => {}
            }

            // Indicator: solid while flowing, blinking while paused.
            let want = match t.phase {
                TapPhase::Idle => false,
                TapPhase::PendingOpen | TapPhase::Running => true,
                TapPhase::Paused => !t.indicator_on,
            };
            if want != t.indicator_on {
                hw.set_indicator(i, want);
                t.indicator_on = want;
            }
        }

        events
    }

    /// Halt a running tap without ending its session.
    pub fn pause(
        &mut self,
        tap: usize,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
    ) -> Result<(), TapError> {
        let t = self.tap_mut(tap)?;
        t.apply(TapInput::Pause)?;
        hw.close_valve(tap);
        t.pause_started_ms = now_ms;
        info!("TAP{}: paused at {}/{} pulses", tap + 1, t.pulses.read(), t.target_pulses);
        Ok(())
    }

    /// Reopen a paused tap.
    pub fn resume(&mut self, tap: usize, hw: &mut impl ActuatorPort) -> Result<(), TapError> {
        let t = self.tap_mut(tap)?;
        t.apply(TapInput::Resume)?;
        hw.open_valve(tap);
        t.manual_trigger_active = false;
        info!("TAP{}: resumed", tap + 1);
        Ok(())
    }

    /// Tap push-button: pauses a running tap, resumes a paused one.
    /// Returns the phase the tap is left in.
    pub fn manual_trigger(
        &mut self,
        tap: usize,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
    ) -> Result<TapPhase, TapError> {
        match self.tap(tap)?.phase {
            TapPhase::Running => {
                self.pause(tap, now_ms, hw)?;
                self.taps[tap].manual_trigger_active = true;
                Ok(TapPhase::Paused)
            }
            TapPhase::Paused => {
                self.resume(tap, hw)?;
                Ok(TapPhase::Running)
            }
            TapPhase::Idle | TapPhase::PendingOpen => Err(TapError::InvalidTransition),
        }
    }

    /// Force-close an open session.
    pub fn abort(&mut self, tap: usize, hw: &mut impl ActuatorPort) -> Result<TapEvent, TapError> {
        let t = self.tap_mut(tap)?;
        t.apply(TapInput::Abort)?;
        hw.close_valve(tap);
        if t.indicator_on {
            hw.set_indicator(tap, false);
            t.indicator_on = false;
        }
        t.end_session();
        let pulses = t.pulses.read();
        warn!("TAP{}: aborted at {}/{} pulses", tap + 1, pulses, t.target_pulses);
        Ok(TapEvent::Aborted {
            tap,
            pulses,
            target_pulses: t.target_pulses,
            reason: AbortReason::Cancelled,
        })
    }

    /// Abort every open session (shutdown path).
    pub fn abort_all(&mut self, hw: &mut impl ActuatorPort) -> TapEvents {
        let mut events = TapEvents::new();
        for tap in 0..NUM_OF_TAPS {
            if let Ok(ev) = self.abort(tap, hw) {
                let _ = events.push(ev);
            }
        }
        events
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self, tap: usize) -> Result<TapStatus, TapError> {
        self.tap(tap)?;
        Ok(self.statuses()[tap])
    }

    /// Status of every tap, in tap order.
    pub fn statuses(&self) -> [TapStatus; NUM_OF_TAPS] {
        core::array::from_fn(|i| {
            let t = &self.taps[i];
            TapStatus {
                phase: t.phase,
                pulses: t.pulses.read(),
                target_pulses: t.target_pulses,
                manual_trigger_active: t.manual_trigger_active,
            }
        })
    }

    pub fn phase(&self, tap: usize) -> Result<TapPhase, TapError> {
        self.tap(tap).map(|t| t.phase)
    }

    /// Lowest-numbered tap with no open session.
    pub fn first_idle(&self) -> Option<usize> {
        self.taps.iter().position(|t| t.phase == TapPhase::Idle)
    }

    pub fn all_idle(&self) -> bool {
        self.taps.iter().all(|t| t.phase == TapPhase::Idle)
    }

    // ── Internal ──────────────────────────────────────────────

    fn tap(&self, tap: usize) -> Result<&Tap, TapError> {
        self.taps.get(tap).ok_or(TapError::InvalidTap)
    }

    fn tap_mut(&mut self, tap: usize) -> Result<&mut Tap, TapError> {
        self.taps.get_mut(tap).ok_or(TapError::InvalidTap)
    }
}
