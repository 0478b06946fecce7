//! Hall-effect flow meter pulse counting.
//!
//! Each tap's flow meter raises one interrupt per unit volume.  The ISR
//! increments that tap's [`PulseCounter`]; the control cycle reads it (and
//! clears it at the start of a dispensing session).
//!
//! The counter is shared between exactly one writer (the ISR) and one
//! reader (the control cycle).  Every access runs inside
//! `critical_section::with`, which masks the interrupt for the duration of
//! the read or read-modify-write, so the cycle can never observe a torn
//! value or lose an increment that raced a clear.

use core::cell::Cell;

use critical_section::Mutex;

use crate::config::NUM_OF_TAPS;

/// Single-writer / single-reader pulse cell.
pub struct PulseCounter {
    count: Mutex<Cell<u32>>,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    /// ISR side: add one pulse.  Saturates instead of wrapping so a stuck
    /// sensor can never make a finished session look unfinished.
    pub fn increment(&self) {
        critical_section::with(|cs| {
            let cell = self.count.borrow(cs);
            cell.set(cell.get().saturating_add(1));
        });
    }

    /// Cycle side: current count, interrupt masked during the read.
    pub fn read(&self) -> u32 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }

    /// Cycle side: read and zero in one critical section.
    pub fn take(&self) -> u32 {
        critical_section::with(|cs| self.count.borrow(cs).replace(0))
    }

    /// Cycle side: zero the count (start of a new session).
    pub fn clear(&self) {
        let _ = self.take();
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-tap counters incremented by the flow meter ISRs.
/// `static` because ISR callbacks in ESP-IDF cannot capture closures.
pub static FLOW_PULSES: [PulseCounter; NUM_OF_TAPS] = [const { PulseCounter::new() }; NUM_OF_TAPS];

/// Called from the GPIO ISR on each rising edge of tap `tap`'s flow meter.
/// Out-of-range indices are ignored (ISR context cannot report errors).
pub fn on_flow_pulse(tap: usize) {
    if let Some(counter) = FLOW_PULSES.get(tap) {
        counter.increment();
    }
}
