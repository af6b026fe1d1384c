//! Counting semaphore.
//!
//! `take` decrements, blocking while the count is zero; `give` increments
//! up to `max_count` and hands the CPU to the first waiter, if any.

use core::cell::RefCell;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::list::TaskList;
use crate::probe::{CycleClock, WakePath};
use crate::sync::Wait;

struct State {
    counter: u32,
    max_count: u32,
    pending_count: u32,
    pending: TaskList,
}

/// Semaphore with a bounded count. `max_count == 1` makes it binary.
///
/// Invariant: `0 <= counter <= max_count`.
pub struct Semaphore {
    state: RefCell<State>,
}

impl Semaphore {
    /// A semaphore with count zero (nothing to take yet).
    pub const fn new(max_count: u32) -> Self {
        Self {
            state: RefCell::new(State {
                counter: 0,
                max_count,
                pending_count: 0,
                pending: TaskList::new(),
            }),
        }
    }

    /// Clear the count and forget every waiter. Pair with a scheduler reset.
    pub fn reset(&mut self) {
        let st = self.state.get_mut();
        st.counter = 0;
        st.pending_count = 0;
        st.pending.clear();
    }

    pub fn counter(&self) -> u32 {
        self.state.borrow().counter
    }

    pub fn max_count(&self) -> u32 {
        self.state.borrow().max_count
    }

    pub fn pending_count(&self) -> u32 {
        self.state.borrow().pending_count
    }

    /// Take without waiting.
    ///
    /// # Errors
    /// [`Error::WouldBlock`] when the count is zero.
    pub fn try_take(&self) -> Result<()> {
        let mut st = self.state.borrow_mut();
        if st.counter > 0 {
            st.counter -= 1;
            Ok(())
        } else {
            Err(Error::WouldBlock)
        }
    }

    /// Decrement the count, blocking the running task while it is zero.
    ///
    /// With [`Wait::Forever`] the caller is parked on the pending list and
    /// re-checks the count every time it is resumed.
    pub async fn take<C: CycleClock>(&self, kernel: &Kernel<C>, wait: Wait) -> Result<()> {
        loop {
            match (self.try_take(), wait) {
                (Ok(()), _) => return Ok(()),
                (Err(e), Wait::NoWait) => return Err(e),
                (Err(_), Wait::Forever) => {
                    let mut st = self.state.borrow_mut();
                    kernel.block_current(&mut st.pending)?;
                    st.pending_count += 1;
                }
            }
            kernel.switch(WakePath::Semaphore).await;
        }
    }

    /// Increment the count. If a task is waiting, move it to the ready list,
    /// queue the caller behind it and switch.
    ///
    /// # Errors
    /// [`Error::Saturated`] when the count is already at `max_count`; no
    /// state changes in that case.
    pub async fn give<C: CycleClock>(&self, kernel: &Kernel<C>) -> Result<()> {
        {
            let mut st = self.state.borrow_mut();
            if st.counter >= st.max_count {
                return Err(Error::Saturated);
            }
            st.counter += 1;
            if st.pending_count == 0 {
                return Ok(());
            }
            if st.pending.len() != st.pending_count as usize {
                return Err(Error::Corrupt);
            }
            kernel.wake_one(&mut st.pending)?;
            st.pending_count -= 1;
        }
        kernel.switch(WakePath::Yield).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::SimClock;
    use crate::switch::TaskContext;
    use crate::sync::testing::poll_once;
    use core::pin::pin;
    use proptest::prelude::*;

    fn kernel(tasks: usize) -> Kernel<SimClock> {
        let kernel = Kernel::new(SimClock::default());
        for _ in 0..tasks {
            kernel.create_task("t").unwrap();
        }
        kernel.reset().unwrap();
        kernel
    }

    #[test]
    fn test_take_without_count() {
        let k = kernel(0);
        let sem = Semaphore::new(1);
        assert_eq!(poll_once(sem.take(&k, Wait::NoWait)), Some(Err(Error::WouldBlock)));
        assert_eq!(sem.try_take(), Err(Error::WouldBlock));
        assert_eq!(sem.counter(), 0);
    }

    #[test]
    fn test_give_then_take() {
        let k = kernel(0);
        let sem = Semaphore::new(1);
        assert_eq!(poll_once(sem.give(&k)), Some(Ok(())));
        assert_eq!(sem.counter(), 1);
        assert_eq!(poll_once(sem.take(&k, Wait::Forever)), Some(Ok(())));
        assert_eq!(sem.counter(), 0);
    }

    #[test]
    fn test_give_saturates() {
        let k = kernel(0);
        let sem = Semaphore::new(2);
        poll_once(sem.give(&k)).unwrap().unwrap();
        poll_once(sem.give(&k)).unwrap().unwrap();
        assert_eq!(poll_once(sem.give(&k)), Some(Err(Error::Saturated)));
        assert_eq!(sem.counter(), 2);
        assert_eq!(sem.max_count(), 2);
    }

    #[test]
    fn test_blocking_take_outside_task_is_corrupt() {
        let k = kernel(1);
        let sem = Semaphore::new(1);
        assert_eq!(poll_once(sem.take(&k, Wait::Forever)), Some(Err(Error::Corrupt)));
        assert_eq!(sem.pending_count(), 0);
    }

    #[test]
    fn test_take_blocks_until_give() {
        let k = kernel(2);
        let sem = Semaphore::new(1);

        let taker = pin!(async {
            sem.take(&k, Wait::Forever).await?;
            // Resumed by the give: the count was consumed here.
            assert_eq!(sem.counter(), 0);
            assert_eq!(sem.pending_count(), 0);
            k.yield_now().await
        });
        let giver = pin!(async {
            assert_eq!(sem.pending_count(), 1);
            k.probe().arm();
            sem.give(&k).await?;
            Ok::<(), Error>(())
        });
        let mut contexts: [TaskContext<'_>; 2] = [taker, giver];

        k.start(&mut contexts).unwrap();

        assert_eq!(sem.counter(), 0);
        assert_eq!(k.probe().costs().get(WakePath::Semaphore).samples, 1);
        assert_eq!(k.probe().costs().get(WakePath::Yield).samples, 0);
    }

    #[test]
    fn test_waiters_wake_in_fifo_order() {
        let k = kernel(3);
        let sem = Semaphore::new(2);
        let parked = Semaphore::new(1);
        let log = RefCell::new(Vec::new());

        let a = pin!(async {
            sem.take(&k, Wait::Forever).await?;
            log.borrow_mut().push("a");
            parked.take(&k, Wait::Forever).await
        });
        let b = pin!(async {
            sem.take(&k, Wait::Forever).await?;
            log.borrow_mut().push("b");
            parked.take(&k, Wait::Forever).await
        });
        let giver = pin!(async {
            assert_eq!(sem.pending_count(), 2);
            sem.give(&k).await?;
            sem.give(&k).await?;
            assert_eq!(*log.borrow(), ["a", "b"]);
            Ok::<(), Error>(())
        });
        let mut contexts: [TaskContext<'_>; 3] = [a, b, giver];

        k.start(&mut contexts).unwrap();

        assert_eq!(sem.counter(), 0);
        assert_eq!(sem.pending_count(), 0);
        assert_eq!(parked.pending_count(), 2);
        k.scheduler().check().unwrap();
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Give,
        Take,
    }

    proptest! {
        #[test]
        fn prop_binary_semaphore_bounds(
            ops in proptest::collection::vec(prop_oneof![Just(Op::Give), Just(Op::Take)], 0..64),
        ) {
            let k = kernel(0);
            let sem = Semaphore::new(1);

            for op in ops {
                let before = sem.counter();
                match op {
                    Op::Give => {
                        let res = poll_once(sem.give(&k)).unwrap();
                        if before == 1 {
                            prop_assert_eq!(res, Err(Error::Saturated));
                            prop_assert_eq!(sem.counter(), 1);
                        } else {
                            prop_assert_eq!(res, Ok(()));
                            prop_assert_eq!(sem.counter(), 1);
                        }
                    }
                    Op::Take => {
                        let res = poll_once(sem.take(&k, Wait::NoWait)).unwrap();
                        if before == 0 {
                            prop_assert_eq!(res, Err(Error::WouldBlock));
                        } else {
                            prop_assert_eq!(res, Ok(()));
                        }
                        prop_assert_eq!(sem.counter(), 0);
                    }
                }
                prop_assert!(sem.counter() <= 1);
                prop_assert_eq!(sem.pending_count(), 0);
            }
        }
    }
}
