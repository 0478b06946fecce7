//! Per-tap indicator LED and the shared buzzer.

use embedded_hal::digital::OutputPin;

use crate::app::ports::Tone;

/// Single-colour LED on one output line.
pub struct Indicator<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Indicator<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) -> Result<(), P::Error> {
        if on {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

const ACCEPT_CHIRP_MS: u64 = 60;
const REJECT_CHIRP_MS: u64 = 400;

/// Active buzzer.  A chirp is started by [`chirp`](Self::chirp) and ended
/// by [`update`](Self::update) once its duration has passed.
pub struct Buzzer<P: OutputPin> {
    pin: P,
    pending: Option<Tone>,
    off_at_ms: Option<u64>,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            pending: None,
            off_at_ms: None,
        }
    }

    /// Request a chirp; it starts on the next [`update`](Self::update).
    pub fn chirp(&mut self, tone: Tone) {
        self.pending = Some(tone);
    }

    pub fn update(&mut self, now_ms: u64) -> Result<(), P::Error> {
        if let Some(tone) = self.pending.take() {
            let len = match tone {
                Tone::Accept => ACCEPT_CHIRP_MS,
                Tone::Reject => REJECT_CHIRP_MS,
            };
            self.pin.set_high()?;
            self.off_at_ms = Some(now_ms.saturating_add(len));
        } else if self.off_at_ms.is_some_and(|t| now_ms >= t) {
            self.pin.set_low()?;
            self.off_at_ms = None;
        }
        Ok(())
    }

    pub fn silence(&mut self) -> Result<(), P::Error> {
        self.pending = None;
        self.off_at_ms = None;
        self.pin.set_low()
    }

    pub fn is_sounding(&self) -> bool {
        self.off_at_ms.is_some()
    }
}
