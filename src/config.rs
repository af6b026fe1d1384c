//! # Benchmark Configuration
//!
//! Compile-time constants governing the scenario and the harness.
//! All limits are fixed at compile time; nothing is allocated.

use crate::sync::EventBits;

/// Capacity of the task table. The scenario only registers
/// [`NUM_TASKS`], the remaining slots exist for tests that need
/// more tasks moving between lists.
pub const MAX_TASKS: usize = 4;

/// Number of tasks taking part in the scripted interaction.
pub const NUM_TASKS: usize = 2;

/// Maximum count of the scenario semaphore (binary semaphore).
pub const SEMAPHORE_MAX_COUNT: u32 = 1;

/// Event bits the giver sets and the taker waits on.
pub const EVENT_BITS: EventBits = 0x51;

/// Capacity of the scenario message queue, in items.
pub const QUEUE_CAPACITY: usize = 5;

/// Item type carried by the scenario queue (one machine word).
pub type QueueItem = u32;

/// The item the giver sends and the taker must receive.
pub const QUEUE_ITEM: QueueItem = 0x1234_5678;

/// Number of measured repetitions per benchmark invocation.
pub const LOOP_COUNT: u32 = 1;

/// Repetitions executed before measuring to warm caches and
/// branch predictors. Their samples are discarded.
pub const WARMUP_ROUNDS: u32 = 1;

/// Back-to-back counter reads used to estimate the sampling overhead.
pub const CALIBRATION_ROUNDS: u32 = 16;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Runtime knobs for a [`Benchmark`](crate::bench::Benchmark).
///
/// Defaults mirror the compile-time constants above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BenchConfig {
    /// Measured repetitions for [`Benchmark::run`](crate::bench::Benchmark::run).
    pub repetitions: u32,

    /// Discarded repetitions executed by `warm_up()`.
    pub warmup_rounds: u32,

    /// Counter read pairs used by `calibrate()`. `0` disables calibration
    /// and leaves the overhead at zero.
    pub calibration_rounds: u32,
}

impl BenchConfig {
    pub const DEFAULT: Self = Self {
        repetitions: LOOP_COUNT,
        warmup_rounds: WARMUP_ROUNDS,
        calibration_rounds: CALIBRATION_ROUNDS,
    };
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
