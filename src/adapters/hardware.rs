//! Hardware adapter: bridges real peripherals to the actuator port.
//!
//! Owns every valve, indicator and the buzzer, exposing them through
//! [`ActuatorPort`].  This is the only module in the system that drives
//! actuators.  On non-espidf targets the GPIO writes are simulation stubs.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{ActuatorPort, Tone};
use crate::config::NUM_OF_TAPS;
use crate::drivers::gpio::GpioOutput;
use crate::drivers::indicator::{Buzzer, Indicator};
use crate::drivers::valve::ValveDriver;
use crate::pins;

/// Concrete adapter that combines all actuators behind the port trait.
pub struct HardwareAdapter<P: OutputPin = GpioOutput> {
    valves: [ValveDriver<P>; NUM_OF_TAPS],
    indicators: [Indicator<P>; NUM_OF_TAPS],
    buzzer: Buzzer<P>,
}

impl HardwareAdapter<GpioOutput> {
    /// Bind to the board's pin table.
    pub fn from_pins() -> Self {
        Self::new(
            core::array::from_fn(|i| {
                let p = pins::TAP_PINS[i];
                ValveDriver::new(GpioOutput::new(p.motor_open), GpioOutput::new(p.motor_close))
            }),
            core::array::from_fn(|i| Indicator::new(GpioOutput::new(pins::TAP_PINS[i].led))),
            Buzzer::new(GpioOutput::new(pins::BUZZER_GPIO)),
        )
    }
}

impl<P: OutputPin<Error = Infallible>> HardwareAdapter<P> {
    pub fn new(
        valves: [ValveDriver<P>; NUM_OF_TAPS],
        indicators: [Indicator<P>; NUM_OF_TAPS],
        buzzer: Buzzer<P>,
    ) -> Self {
        Self {
            valves,
            indicators,
            buzzer,
        }
    }

    /// Advance time-based outputs (buzzer chirps).  Once per cycle.
    pub fn update(&mut self, now_ms: u64) {
        let Ok(()) = self.buzzer.update(now_ms);
    }

    pub fn valve_open(&self, tap: usize) -> bool {
        self.valves.get(tap).is_some_and(ValveDriver::is_open)
    }

    pub fn indicator_on(&self, tap: usize) -> bool {
        self.indicators.get(tap).is_some_and(Indicator::is_on)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: OutputPin<Error = Infallible>> ActuatorPort for HardwareAdapter<P> {
    fn open_valve(&mut self, tap: usize) {
        match self.valves.get_mut(tap) {
            Some(v) => {
                let Ok(()) = v.open();
            }
            None => warn!("HW: open_valve on unknown tap {}", tap),
        }
    }

    fn close_valve(&mut self, tap: usize) {
        match self.valves.get_mut(tap) {
            Some(v) => {
                let Ok(()) = v.close();
            }
            None => warn!("HW: close_valve on unknown tap {}", tap),
        }
    }

    fn set_indicator(&mut self, tap: usize, on: bool) {
        if let Some(led) = self.indicators.get_mut(tap) {
            let Ok(()) = led.set(on);
        }
    }

    fn beep(&mut self, tone: Tone) {
        self.buzzer.chirp(tone);
    }

    fn all_off(&mut self) {
        for v in &mut self.valves {
            let Ok(()) = v.close();
        }
        for led in &mut self.indicators {
            let Ok(()) = led.set(false);
        }
        let Ok(()) = self.buzzer.silence();
    }
}
