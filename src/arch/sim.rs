//! # Simulated Cycle Counter
//!
//! Deterministic clock for host runs and tests: every read returns the
//! current value and then advances it by a fixed step, so the cost of a
//! code path is proportional to the number of counter reads it performs
//! plus any explicit [`SimClock::advance`].

use core::cell::Cell;

use crate::probe::{CycleClock, Cycles};

#[derive(Debug)]
pub struct SimClock {
    now: Cell<Cycles>,
    step: Cycles,
}

impl SimClock {
    pub const fn new(start: Cycles, step: Cycles) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    /// Let `cycles` pass without a read.
    pub fn advance(&self, cycles: Cycles) {
        self.now.set(self.now.get().wrapping_add(cycles));
    }

    /// Peek without advancing.
    pub fn now(&self) -> Cycles {
        self.now.get()
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl CycleClock for SimClock {
    fn read_cycle_counter(&self) -> Cycles {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}
