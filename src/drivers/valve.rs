//! Motorised ball valve driver (two-wire, open/close coils).
//!
//! Driving `open` HIGH turns the valve towards open, driving `close` HIGH
//! turns it towards closed.  Both HIGH at once would short the H-bridge,
//! so every command drops the opposite line first.
//!
//! ## Safety contract
//!
//! The tap controller decides when a valve may open; this driver is a dumb
//! actuator and never opens on its own.

use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Closed,
    Open,
}

pub struct ValveDriver<P: OutputPin> {
    open: P,
    close: P,
    state: ValveState,
}

impl<P: OutputPin> ValveDriver<P> {
    /// Take both coil lines.  The valve is assumed closed at boot.
    pub fn new(open: P, close: P) -> Self {
        Self {
            open,
            close,
            state: ValveState::Closed,
        }
    }

    pub fn open(&mut self) -> Result<(), P::Error> {
        self.close.set_low()?;
        self.open.set_high()?;
        self.state = ValveState::Open;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), P::Error> {
        self.open.set_low()?;
        self.close.set_high()?;
        self.state = ValveState::Closed;
        Ok(())
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ValveState::Open
    }
}
