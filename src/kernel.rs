//! # Kernel
//!
//! Owns the scheduler and the instrumentation probe, and exposes the
//! operations the synchronization primitives are built from.
//!
//! The kernel is shared by reference between the task contexts of a
//! repetition. Its state sits behind `RefCell`/`Cell`: exactly one task
//! executes at a time and no borrow is ever held across a suspension
//! point, so a failed borrow can only mean a kernel bug.
//!
//! ## Repetition Sequence
//!
//! ```text
//! Benchmark::run_once()
//!   ├─► Kernel::reset()           ← ready list repopulated, no task running
//!   ├─► primitives reset          ← counters, masks, queues, pending lists
//!   └─► switch::start()           ← invoke_first_task(), then trampoline
//!         ├─► task blocks/wakes   ← block_current() / wake_one() + switch()
//!         └─► a task returns      ← back to the driver
//! ```

use core::cell::{Ref, RefCell};

use crate::error::{Error, Result};
use crate::list::TaskList;
use crate::probe::{CycleClock, Probe, WakePath};
use crate::scheduler::Scheduler;
use crate::switch::{self, Suspend, TaskContext};
use crate::task::{ContextHandle, TaskId};

/// Scheduler plus wake-path probe, shared by reference between the task
/// contexts of a repetition.
pub struct Kernel<C> {
    sched: RefCell<Scheduler>,
    probe: Probe<C>,
}

impl<C: CycleClock> Kernel<C> {
    pub const fn new(clock: C) -> Self {
        Self {
            sched: RefCell::new(Scheduler::new()),
            probe: Probe::new(clock),
        }
    }

    /// Register a task. Only valid before the first repetition.
    ///
    /// # Returns
    /// - `Ok(task_id)`: the task's index, which is also its context slot.
    /// - `Err(Error::Full)`: the task table is full.
    pub fn create_task(&self, name: &'static str) -> Result<TaskId> {
        self.sched.borrow_mut().create_task(name)
    }

    /// Reinitialize every task and the ready list.
    pub fn reset(&self) -> Result<()> {
        self.sched.borrow_mut().reset()
    }

    /// Run the given contexts until one returns. See [`switch::start`].
    pub fn start(&self, contexts: &mut [TaskContext<'_>]) -> Result<()> {
        switch::start(self, contexts)
    }

    #[inline]
    pub fn probe(&self) -> &Probe<C> {
        &self.probe
    }

    /// Read access to the scheduler, for inspection between repetitions.
    pub fn scheduler(&self) -> Ref<'_, Scheduler> {
        self.sched.borrow()
    }

    // -----------------------------------------------------------------------
    // Trampoline hooks
    // -----------------------------------------------------------------------

    pub(crate) fn invoke_first_task(&self) -> Result<ContextHandle> {
        self.sched.borrow_mut().invoke_first_task()
    }

    /// Called by the trampoline when the running context suspended.
    pub(crate) fn context_switch(&self, saved: ContextHandle) -> Result<ContextHandle> {
        let mut sched = self.sched.borrow_mut();
        if !sched.take_switch_request() {
            return Err(Error::Corrupt);
        }
        sched.select_next(saved)
    }

    // -----------------------------------------------------------------------
    // Primitive building blocks
    // -----------------------------------------------------------------------

    /// Park the running task on `pending`. The caller must `switch()` next.
    pub(crate) fn block_current(&self, pending: &mut TaskList) -> Result<()> {
        self.sched.borrow_mut().block_current(pending)
    }

    /// Move one waiter from `pending` to ready, re-enqueue the running task
    /// behind it. The caller must `switch()` next.
    pub(crate) fn wake_one(&self, pending: &mut TaskList) -> Result<TaskId> {
        self.sched.borrow_mut().wake_one(pending)
    }

    /// Hand the CPU over and, once resumed, close any armed sample on
    /// `path`.
    pub(crate) async fn switch(&self, path: WakePath) {
        Suspend::new().await;
        self.probe.record(path);
    }

    /// Voluntarily give up the CPU to the next ready task.
    ///
    /// The caller goes to the back of the ready list, so with two tasks
    /// this hands over to the other one.
    pub async fn yield_now(&self) -> Result<()> {
        self.sched.borrow_mut().yield_current()?;
        self.switch(WakePath::Yield).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::SimClock;
    use crate::task::TaskState;
    use core::cell::Cell;
    use core::pin::pin;

    #[test]
    fn test_yield_ping_pong() {
        let kernel = Kernel::new(SimClock::default());
        kernel.create_task("ping").unwrap();
        kernel.create_task("pong").unwrap();
        kernel.reset().unwrap();

        let trace = RefCell::new(Vec::new());
        let ping = pin!(async {
            for i in 0..3 {
                trace.borrow_mut().push(("ping", i));
                kernel.yield_now().await?;
            }
            Ok::<(), Error>(())
        });
        let pong = pin!(async {
            for i in 0..3 {
                trace.borrow_mut().push(("pong", i));
                kernel.yield_now().await?;
            }
            Ok::<(), Error>(())
        });
        let mut contexts: [TaskContext<'_>; 2] = [ping, pong];

        kernel.start(&mut contexts).unwrap();

        assert_eq!(
            *trace.borrow(),
            vec![
                ("ping", 0),
                ("pong", 0),
                ("ping", 1),
                ("pong", 1),
                ("ping", 2),
                ("pong", 2),
            ]
        );
        // ping finished first and returned to the driver.
        assert_eq!(kernel.scheduler().current(), Some(TaskId(0)));
        assert_eq!(kernel.scheduler().switch_count(), 6);
    }

    #[test]
    fn test_task_error_returns_to_driver() {
        let kernel = Kernel::new(SimClock::default());
        kernel.create_task("fails").unwrap();
        kernel.reset().unwrap();

        let fails = pin!(async { Err::<(), Error>(Error::WouldBlock) });
        let mut contexts: [TaskContext<'_>; 1] = [fails];

        assert_eq!(kernel.start(&mut contexts), Err(Error::WouldBlock));
    }

    #[test]
    fn test_suspend_without_request_is_corrupt() {
        let kernel = Kernel::new(SimClock::default());
        kernel.create_task("rogue").unwrap();
        kernel.reset().unwrap();

        let rogue = pin!(async {
            Suspend::new().await;
            Ok::<(), Error>(())
        });
        let mut contexts: [TaskContext<'_>; 1] = [rogue];

        assert_eq!(kernel.start(&mut contexts), Err(Error::Corrupt));
    }

    #[test]
    fn test_missing_context_is_corrupt() {
        let kernel = Kernel::new(SimClock::default());
        kernel.create_task("a").unwrap();
        kernel.create_task("b").unwrap();
        kernel.reset().unwrap();

        let a = pin!(async { kernel.yield_now().await });
        let mut contexts: [TaskContext<'_>; 1] = [a];

        assert_eq!(kernel.start(&mut contexts), Err(Error::Corrupt));
    }

    #[test]
    fn test_lone_task_yields_to_itself() {
        let kernel = Kernel::new(SimClock::default());
        kernel.create_task("solo").unwrap();
        kernel.reset().unwrap();

        let rounds = Cell::new(0);
        let solo = pin!(async {
            while rounds.get() < 3 {
                rounds.set(rounds.get() + 1);
                kernel.yield_now().await?;
            }
            Ok::<(), Error>(())
        });
        let mut contexts: [TaskContext<'_>; 1] = [solo];

        kernel.start(&mut contexts).unwrap();
        assert_eq!(rounds.get(), 3);
        assert_eq!(kernel.scheduler().tasks()[0].state, TaskState::Running);
    }
}
