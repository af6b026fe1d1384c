//! # Benchmark Driver
//!
//! Runs the scripted two-task interaction and collects one wake-path
//! sample per primitive per repetition.
//!
//! ## Scenario
//!
//! ```text
//!   taker (task 0)                   giver (task 1)
//!   ──────────────                   ──────────────
//!   take(sem)      → blocked
//!                                    arm, give(sem)      ─┐
//!   ◄── record(Semaphore) ───────────────────────────────┘
//!   get(0x51, AND|OR|CLEAR) → blocked
//!                                    arm, set(0x51)      ─┐
//!   ◄── record(Event) ───────────────────────────────────┘
//!   receive(queue) → blocked
//!                                    arm, send(item)     ─┐
//!   ◄── record(Queue) ───────────────────────────────────┘
//!   arm, yield                    ─┐
//!                                  └─► record(Yield), return to driver
//! ```
//!
//! The taker is created first so it is the ready-list head and blocks
//! before the giver ever runs. After a repetition every primitive is back
//! to empty; [`Benchmark::verify`] checks exactly that.

use core::cell::Cell;
use core::pin::pin;

use crate::config::{
    BenchConfig, QueueItem, EVENT_BITS, NUM_TASKS, QUEUE_CAPACITY, QUEUE_ITEM,
    SEMAPHORE_MAX_COUNT,
};
use crate::error::Result;
use crate::kernel::Kernel;
use crate::probe::{CycleClock, Cycles, WakeCosts};
use crate::switch::TaskContext;
use crate::sync::{EventCondition, EventGroup, MessageQueue, Semaphore, Wait};
use crate::task::TaskId;

/// Observable state after a repetition. Two repetitions from the same
/// starting point must produce equal snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FinalState {
    pub semaphore_count: u32,
    pub event_mask: u32,
    pub queue_len: usize,
    /// Tasks still parked on any pending list.
    pub waiters: u32,
    pub received: Option<QueueItem>,
}

pub struct Benchmark<C> {
    kernel: Kernel<C>,
    semaphore: Semaphore,
    events: EventGroup,
    queue: MessageQueue<QueueItem, QUEUE_CAPACITY>,
    received: Cell<Option<QueueItem>>,
    taker: TaskId,
    giver: TaskId,
    config: BenchConfig,
}

impl<C: CycleClock> Benchmark<C> {
    /// Register the taker and giver tasks, in that order.
    pub fn new(clock: C, config: BenchConfig) -> Result<Self> {
        let kernel = Kernel::new(clock);
        let taker = kernel.create_task("taker")?;
        let giver = kernel.create_task("giver")?;
        debug_assert_eq!(kernel.scheduler().task_count(), NUM_TASKS);

        Ok(Self {
            kernel,
            semaphore: Semaphore::new(SEMAPHORE_MAX_COUNT),
            events: EventGroup::new(),
            queue: MessageQueue::new(),
            received: Cell::new(None),
            taker,
            giver,
            config,
        })
    }

    /// Measure the counter read overhead with `config.calibration_rounds`.
    pub fn calibrate(&self) -> Result<Cycles> {
        let overhead = self.kernel.probe().calibrate(self.config.calibration_rounds)?;
        info!("[BENCH] calibrated, overhead {} cycles", overhead);
        Ok(overhead)
    }

    /// Bring the scheduler and every primitive back to their initial state.
    ///
    /// Cost accumulators and the calibrated overhead survive; use
    /// [`Benchmark::clear_costs`] to drop samples.
    pub fn reset(&mut self) -> Result<()> {
        self.kernel.reset()?;
        self.semaphore.reset();
        self.events.reset();
        self.queue.reset();
        self.received.set(None);
        self.kernel.probe().disarm();
        Ok(())
    }

    /// One repetition: reset, build fresh contexts, run until the giver
    /// returns.
    pub fn run_once(&mut self) -> Result<()> {
        self.reset()?;

        let this = &*self;
        let taker = pin!(this.taker_script());
        let giver = pin!(this.giver_script());

        // Context slots are indexed by task id.
        debug_assert!(this.taker.index() == 0 && this.giver.index() == 1);
        let mut contexts: [TaskContext<'_>; NUM_TASKS] = [taker, giver];

        match this.kernel.start(&mut contexts) {
            Ok(()) => {
                debug!(
                    "[BENCH] repetition done, {} switches",
                    this.kernel.scheduler().switch_count()
                );
                Ok(())
            }
            Err(e) => {
                warn!("[BENCH] repetition failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run `repetitions` back-to-back repetitions.
    ///
    /// Stops at the first failing repetition.
    pub fn run(&mut self, repetitions: u32) -> Result<()> {
        info!("[BENCH] running {} repetitions", repetitions);
        for _ in 0..repetitions {
            self.run_once()?;
        }
        Ok(())
    }

    /// Run the configured warm-up repetitions and discard their samples.
    pub fn warm_up(&mut self) -> Result<()> {
        self.run(self.config.warmup_rounds)?;
        self.clear_costs();
        Ok(())
    }

    pub fn clear_costs(&self) {
        self.kernel.probe().clear();
    }

    /// Whether the last repetition left the expected final state.
    pub fn verify(&self) -> bool {
        self.snapshot()
            == FinalState {
                semaphore_count: 0,
                event_mask: 0,
                queue_len: 0,
                waiters: 0,
                received: Some(QUEUE_ITEM),
            }
    }

    pub fn snapshot(&self) -> FinalState {
        FinalState {
            semaphore_count: self.semaphore.counter(),
            event_mask: self.events.mask(),
            queue_len: self.queue.len(),
            waiters: self.semaphore.pending_count()
                + self.events.pending_count()
                + self.queue.pending_count(),
            received: self.received.get(),
        }
    }

    #[inline]
    pub fn costs(&self) -> WakeCosts {
        self.kernel.probe().costs()
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn kernel(&self) -> &Kernel<C> {
        &self.kernel
    }

    pub fn semaphore(&self) -> &Semaphore {
        &self.semaphore
    }

    pub fn events(&self) -> &EventGroup {
        &self.events
    }

    pub fn queue(&self) -> &MessageQueue<QueueItem, QUEUE_CAPACITY> {
        &self.queue
    }

    /// Item the taker pulled off the queue in the last repetition.
    pub fn received(&self) -> Option<QueueItem> {
        self.received.get()
    }

    pub fn taker(&self) -> TaskId {
        self.taker
    }

    pub fn giver(&self) -> TaskId {
        self.giver
    }

    // -----------------------------------------------------------------------
    // Task scripts
    // -----------------------------------------------------------------------

    async fn taker_script(&self) -> Result<()> {
        let k = &self.kernel;

        self.semaphore.take(k, Wait::Forever).await?;

        let cond = EventCondition::AND | EventCondition::OR | EventCondition::CLEAR;
        self.events.get(k, EVENT_BITS, cond, Wait::Forever).await?;

        let item = self.queue.receive(k, Wait::Forever).await?;
        self.received.set(Some(item));

        k.probe().arm();
        k.yield_now().await
    }

    async fn giver_script(&self) -> Result<()> {
        let k = &self.kernel;

        k.probe().arm();
        self.semaphore.give(k).await?;

        k.probe().arm();
        self.events.set(k, EVENT_BITS).await?;

        k.probe().arm();
        self.queue.send(k, QUEUE_ITEM).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::SimClock;
    use crate::error::Error;
    use crate::probe::WakePath;
    use proptest::prelude::*;

    fn bench() -> Benchmark<SimClock> {
        Benchmark::new(SimClock::default(), BenchConfig::DEFAULT).unwrap()
    }

    #[test]
    fn test_task_order() {
        let b = bench();
        assert_eq!(b.taker(), TaskId(0));
        assert_eq!(b.giver(), TaskId(1));
        assert_eq!(b.kernel().scheduler().task(b.taker()).unwrap().name, "taker");
    }

    #[test]
    fn test_single_repetition_final_state() {
        let mut b = bench();
        b.run_once().unwrap();

        assert!(b.verify());
        let state = b.snapshot();
        assert_eq!(state.semaphore_count, 0);
        assert_eq!(state.event_mask, 0);
        assert_eq!(state.queue_len, 0);
        assert_eq!(state.waiters, 0);
        assert_eq!(b.received(), Some(0x1234_5678));
    }

    #[test]
    fn test_one_sample_per_path() {
        let mut b = bench();
        b.run_once().unwrap();

        for (path, stats) in b.costs().iter() {
            assert_eq!(stats.samples, 1, "{}", path.name());
        }
    }

    #[test]
    fn test_costs_reflect_counter_reads() {
        // Every sample is exactly one read apart: arm, switch, record.
        let mut b = Benchmark::new(SimClock::new(0, 4), BenchConfig::DEFAULT).unwrap();
        assert_eq!(b.calibrate(), Ok(4));
        b.run_once().unwrap();

        for (_, stats) in b.costs().iter() {
            assert_eq!(stats.last, 0);
        }
    }

    #[test]
    fn test_switch_count() {
        let mut b = bench();
        b.run_once().unwrap();
        // Three blocks, three wakes and the final yield.
        assert_eq!(b.kernel().scheduler().switch_count(), 7);
    }

    #[test]
    fn test_reset_clears_primitives_not_costs() {
        let mut b = bench();
        b.run_once().unwrap();
        b.reset().unwrap();

        assert_eq!(b.received(), None);
        assert!(!b.verify());
        assert_eq!(b.kernel().scheduler().ready().len(), NUM_TASKS);
        assert_eq!(b.costs().get(WakePath::Queue).samples, 1);
    }

    #[test]
    fn test_warm_up_discards_samples() {
        let mut b = Benchmark::new(
            SimClock::default(),
            BenchConfig {
                warmup_rounds: 3,
                ..BenchConfig::DEFAULT
            },
        )
        .unwrap();
        assert_eq!(b.config().warmup_rounds, 3);
        b.warm_up().unwrap();

        assert!(b.verify());
        // The switch count covers the last repetition only.
        assert_eq!(b.kernel().scheduler().switch_count(), 7);
        assert_eq!(b.costs(), WakeCosts::new());
    }

    #[test]
    fn test_calibrate_broken_clock() {
        let b = Benchmark::new(SimClock::new(0, 0), BenchConfig::DEFAULT).unwrap();
        assert_eq!(b.calibrate(), Err(Error::ClockFault));
    }

    proptest! {
        #[test]
        fn prop_repetitions_are_idempotent(n in 1u32..16) {
            let mut b = bench();
            b.run_once().unwrap();
            let first = b.snapshot();

            b.run(n).unwrap();

            prop_assert!(b.verify());
            prop_assert_eq!(b.snapshot(), first);
            for (_, stats) in b.costs().iter() {
                prop_assert_eq!(stats.samples, n + 1);
            }
        }
    }
}
