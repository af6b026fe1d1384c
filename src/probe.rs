//! # Cycle Instrumentation
//!
//! Wake-path latency sampling around the context switch.
//!
//! A waking or yielding task calls [`Probe::arm`] immediately before the
//! call that hands the CPU over. The task that resumes calls
//! [`Probe::record`] immediately after control comes back past its switch
//! point, attributing the elapsed cycles to the [`WakePath`] it resumed on.
//!
//! ```text
//!   giver                          taker
//!   ─────                          ─────
//!   arm()  ── t0                   take() → blocked
//!   give() ─── switch ──────────►  resumes in take()
//!                                  record(Semaphore) ── t1
//!                                  cost = t1 - t0 - overhead
//! ```
//!
//! The overhead of one counter read is estimated by [`Probe::calibrate`]
//! and subtracted from every sample.

use core::cell::Cell;

use crate::error::{Error, Result};

/// Raw counter value. 32-bit, differences wrap.
pub type Cycles = u32;

/// Opaque monotonic cycle counter.
pub trait CycleClock {
    fn read_cycle_counter(&self) -> Cycles;
}

impl<C: CycleClock + ?Sized> CycleClock for &C {
    #[inline]
    fn read_cycle_counter(&self) -> Cycles {
        (**self).read_cycle_counter()
    }
}

// ---------------------------------------------------------------------------
// Wake paths
// ---------------------------------------------------------------------------

/// The resume point a sample is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakePath {
    /// A task blocked in `Semaphore::take` resumed after a `give`.
    Semaphore,
    /// A task blocked in `EventGroup::get` resumed after a `set`.
    Event,
    /// A task blocked in `MessageQueue::receive` resumed after a `send`.
    Queue,
    /// A task that woke another (or yielded) got the CPU back.
    Yield,
}

impl WakePath {
    pub const COUNT: usize = 4;
    pub const ALL: [WakePath; Self::COUNT] = [
        WakePath::Semaphore,
        WakePath::Event,
        WakePath::Queue,
        WakePath::Yield,
    ];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            WakePath::Semaphore => "semaphore_give",
            WakePath::Event => "event_set",
            WakePath::Queue => "queue_send",
            WakePath::Yield => "task_yield",
        }
    }
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

/// Accumulated samples for one wake path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PathStats {
    pub last: Cycles,
    pub min: Cycles,
    pub max: Cycles,
    pub total: u64,
    pub samples: u32,
}

impl PathStats {
    pub const EMPTY: Self = Self {
        last: 0,
        min: Cycles::MAX,
        max: 0,
        total: 0,
        samples: 0,
    };

    fn add(&mut self, cost: Cycles) {
        self.last = cost;
        self.min = self.min.min(cost);
        self.max = self.max.max(cost);
        self.total += u64::from(cost);
        self.samples += 1;
    }

    /// Mean cost, or `None` without samples.
    pub fn mean(&self) -> Option<Cycles> {
        if self.samples == 0 {
            None
        } else {
            Some((self.total / u64::from(self.samples)) as Cycles)
        }
    }
}

/// Per-path accumulators, readable by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeCosts {
    paths: [PathStats; WakePath::COUNT],
}

impl WakeCosts {
    pub const fn new() -> Self {
        Self {
            paths: [PathStats::EMPTY; WakePath::COUNT],
        }
    }

    #[inline]
    pub fn get(&self, path: WakePath) -> &PathStats {
        &self.paths[path.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (WakePath, &PathStats)> + '_ {
        WakePath::ALL.iter().map(move |&p| (p, self.get(p)))
    }
}

impl Default for WakeCosts {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Sampling state shared by all tasks of a run.
pub struct Probe<C> {
    clock: C,
    start: Cell<Option<Cycles>>,
    overhead: Cell<Cycles>,
    costs: Cell<WakeCosts>,
}

impl<C: CycleClock> Probe<C> {
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            start: Cell::new(None),
            overhead: Cell::new(0),
            costs: Cell::new(WakeCosts::new()),
        }
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Take the start sample for the next wake.
    #[inline]
    pub fn arm(&self) {
        self.start.set(Some(self.clock.read_cycle_counter()));
    }

    /// Drop a start sample that will never be paired.
    pub fn disarm(&self) {
        self.start.set(None);
    }

    /// Close the armed sample and attribute it to `path`.
    ///
    /// Without an armed start this is a no-op and returns `None`: the task
    /// resumed on a path nobody is measuring.
    pub fn record(&self, path: WakePath) -> Option<Cycles> {
        let end = self.clock.read_cycle_counter();
        let start = self.start.take()?;
        let cost = end.wrapping_sub(start).saturating_sub(self.overhead.get());

        let mut costs = self.costs.get();
        costs.paths[path.index()].add(cost);
        self.costs.set(costs);

        trace!("[PROBE] {=str}: {} cycles", path.name(), cost);
        Some(cost)
    }

    /// Estimate the cost of one counter read.
    ///
    /// Reads the counter twice back to back `rounds` times and keeps the
    /// smallest delta as the overhead subtracted from every sample.
    ///
    /// # Errors
    /// [`Error::ClockFault`] if the second read of a pair is not after the
    /// first.
    pub fn calibrate(&self, rounds: u32) -> Result<Cycles> {
        let mut best: Option<Cycles> = None;
        for _ in 0..rounds {
            let start = self.clock.read_cycle_counter();
            let end = self.clock.read_cycle_counter();
            if end <= start {
                warn!("[PROBE] counter did not advance: {} -> {}", start, end);
                return Err(Error::ClockFault);
            }
            let delta = end - start;
            best = Some(best.map_or(delta, |b| b.min(delta)));
        }

        let overhead = best.unwrap_or(0);
        self.overhead.set(overhead);
        debug!("[PROBE] overhead {} cycles over {} rounds", overhead, rounds);
        Ok(overhead)
    }

    #[inline]
    pub fn overhead(&self) -> Cycles {
        self.overhead.get()
    }

    #[inline]
    pub fn costs(&self) -> WakeCosts {
        self.costs.get()
    }

    /// Reset accumulators and any armed sample. The overhead is kept.
    pub fn clear(&self) {
        self.start.set(None);
        self.costs.set(WakeCosts::new());
    }
}
