//! # Cortex-M4 Port Layer
//!
//! Hardware-specific pieces for the ARM Cortex-M4 (Thumb-2):
//! the DWT cycle counter used as the benchmark clock, and the
//! critical section each measured repetition runs in.
//!
//! ## Cycle Counter
//!
//! CYCCNT is a free-running 32-bit counter clocked by the core. It only
//! counts once trace is enabled in DCB.DEMCR (TRCENA) and CYCCNTENA is set
//! in DWT.CTRL. On parts with a software lock (Cortex-M7) the DWT must be
//! unlocked first; on the M4 the unlock is harmless.

use cortex_m::interrupt;
use cortex_m::peripheral::{DCB, DWT};

use crate::probe::{CycleClock, Cycles};

// ---------------------------------------------------------------------------
// DWT clock
// ---------------------------------------------------------------------------

/// [`CycleClock`] over DWT.CYCCNT.
///
/// Constructing it through [`DwtClock::enable`] guarantees the counter is
/// running before the first read.
pub struct DwtClock {
    _enabled: (),
}

impl DwtClock {
    /// Enable trace and start CYCCNT from zero.
    pub fn enable(dcb: &mut DCB, dwt: &mut DWT) -> Self {
        dcb.enable_trace();
        DWT::unlock();
        dwt.set_cycle_count(0);
        dwt.enable_cycle_counter();
        Self { _enabled: () }
    }
}

impl CycleClock for DwtClock {
    #[inline(always)]
    fn read_cycle_counter(&self) -> Cycles {
        DWT::cycle_count()
    }
}

// ---------------------------------------------------------------------------
// Critical section
// ---------------------------------------------------------------------------

/// Execute a closure with interrupts disabled.
///
/// Each repetition of the benchmark runs inside one of these so that no
/// interrupt handler lands between an `arm()` and its `record()`.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
