//! Bounded FIFO message queue.
//!
//! A fixed ring of `N` items copied in and out by value. `send` never
//! blocks and fails with [`Error::Full`] at capacity; `receive` can wait
//! for an item.
//!
//! ```text
//!    pop_index        push_index
//!        │                │
//!   ┌────▼───┬────────┬───▼────┬────────┬────────┐
//!   │ item 0 │ item 1 │  ....  │  ....  │  ....  │   count = 2
//!   └────────┴────────┴────────┴────────┴────────┘
//! ```
//!
//! Both indices advance by one slot modulo `N`.

use core::cell::RefCell;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::list::TaskList;
use crate::probe::{CycleClock, WakePath};
use crate::sync::Wait;

struct State<T, const N: usize> {
    buf: [T; N],
    push_index: usize,
    pop_index: usize,
    count: usize,
    pending_count: u32,
    pending: TaskList,
}

pub struct MessageQueue<T, const N: usize> {
    state: RefCell<State<T, N>>,
}

impl<T: Copy + Default, const N: usize> MessageQueue<T, N> {
    const NON_EMPTY: () = assert!(N > 0, "queue capacity must be non-zero");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            state: RefCell::new(State {
                buf: [T::default(); N],
                push_index: 0,
                pop_index: 0,
                count: 0,
                pending_count: 0,
                pending: TaskList::new(),
            }),
        }
    }

    /// Empty the ring and forget every waiter. Pair with a scheduler reset.
    pub fn reset(&mut self) {
        let st = self.state.get_mut();
        st.push_index = 0;
        st.pop_index = 0;
        st.count = 0;
        st.pending_count = 0;
        st.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.state.borrow().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn pending_count(&self) -> u32 {
        self.state.borrow().pending_count
    }

    /// Copy `item` into the ring.
    ///
    /// # Errors
    /// [`Error::Full`] at capacity; the queue is left untouched.
    pub fn try_send(&self, item: T) -> Result<()> {
        let mut st = self.state.borrow_mut();
        if st.count == N {
            return Err(Error::Full);
        }
        let at = st.push_index;
        st.buf[at] = item;
        st.push_index = (at + 1) % N;
        st.count += 1;
        Ok(())
    }

    /// Copy the oldest item out of the ring.
    ///
    /// # Errors
    /// [`Error::WouldBlock`] when the queue is empty.
    pub fn try_receive(&self) -> Result<T> {
        let mut st = self.state.borrow_mut();
        if st.count == 0 {
            return Err(Error::WouldBlock);
        }
        let at = st.pop_index;
        let item = st.buf[at];
        st.pop_index = (at + 1) % N;
        st.count -= 1;
        Ok(item)
    }

    /// Enqueue `item`. If a task is waiting, move it to the ready list,
    /// queue the caller behind it and switch.
    ///
    /// Never blocks: a full queue is reported, not waited on.
    pub async fn send<C: CycleClock>(&self, kernel: &Kernel<C>, item: T) -> Result<()> {
        self.try_send(item)?;
        {
            let mut st = self.state.borrow_mut();
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

    /// Dequeue the oldest item, waiting for one with [`Wait::Forever`].
    pub async fn receive<C: CycleClock>(&self, kernel: &Kernel<C>, wait: Wait) -> Result<T> {
        loop {
            match (self.try_receive(), wait) {
                (Ok(item), _) => return Ok(item),
                (Err(e), Wait::NoWait) => return Err(e),
                (Err(_), Wait::Forever) => {
                    let mut st = self.state.borrow_mut();
                    kernel.block_current(&mut st.pending)?;
                    st.pending_count += 1;
                }
            }
            kernel.switch(WakePath::Queue).await;
        }
    }
}

impl<T: Copy + Default, const N: usize> Default for MessageQueue<T, N> {
    fn default() -> Self {
        Self::new()
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
    fn test_fifo_order() {
        let k = kernel(0);
        let q: MessageQueue<u32, 5> = MessageQueue::new();
        for item in [10, 20, 30] {
            poll_once(q.send(&k, item)).unwrap().unwrap();
        }
        assert_eq!(q.len(), 3);
        for item in [10, 20, 30] {
            assert_eq!(poll_once(q.receive(&k, Wait::NoWait)), Some(Ok(item)));
        }
        assert!(q.is_empty());
        assert_eq!(poll_once(q.receive(&k, Wait::NoWait)), Some(Err(Error::WouldBlock)));
    }

    #[test]
    fn test_send_full() {
        let k = kernel(0);
        let q: MessageQueue<u32, 5> = MessageQueue::new();
        for item in 0..5 {
            poll_once(q.send(&k, item)).unwrap().unwrap();
        }
        assert!(q.is_full());
        assert_eq!(poll_once(q.send(&k, 99)), Some(Err(Error::Full)));
        assert_eq!(q.len(), 5);
        // The rejected item did not overwrite anything.
        assert_eq!(q.try_receive(), Ok(0));
    }

    #[test]
    fn test_wraparound() {
        let q: MessageQueue<u8, 3> = MessageQueue::new();
        for round in 0..10u8 {
            q.try_send(round).unwrap();
            q.try_send(round.wrapping_add(100)).unwrap();
            assert_eq!(q.try_receive(), Ok(round));
            assert_eq!(q.try_receive(), Ok(round.wrapping_add(100)));
        }
        assert!(q.is_empty());
        assert_eq!(q.capacity(), 3);
    }

    #[test]
    fn test_reset_empties() {
        let mut q: MessageQueue<u32, 2> = MessageQueue::new();
        q.try_send(1).unwrap();
        q.reset();
        assert!(q.is_empty());
        assert_eq!(q.try_receive(), Err(Error::WouldBlock));
        q.try_send(2).unwrap();
        assert_eq!(q.try_receive(), Ok(2));
    }

    #[test]
    fn test_receive_blocks_until_send() {
        let k = kernel(2);
        let q: MessageQueue<u32, 5> = MessageQueue::new();

        let receiver = pin!(async {
            let item = q.receive(&k, Wait::Forever).await?;
            assert_eq!(item, 0xabcd);
            assert_eq!(q.pending_count(), 0);
            k.yield_now().await
        });
        let sender = pin!(async {
            assert_eq!(q.pending_count(), 1);
            k.probe().arm();
            q.send(&k, 0xabcd).await?;
            Ok::<(), Error>(())
        });
        let mut contexts: [TaskContext<'_>; 2] = [receiver, sender];

        k.start(&mut contexts).unwrap();

        assert!(q.is_empty());
        assert_eq!(k.probe().costs().get(WakePath::Queue).samples, 1);
    }

    proptest! {
        #[test]
        fn prop_count_bounded_and_fifo(
            ops in proptest::collection::vec(proptest::option::of(any::<u16>()), 0..128),
        ) {
            let q: MessageQueue<u16, 5> = MessageQueue::new();
            let mut model = std::collections::VecDeque::new();

            // Some(x) sends x, None receives.
            for op in ops {
                match op {
                    Some(item) => {
                        let res = q.try_send(item);
                        if model.len() == 5 {
                            prop_assert_eq!(res, Err(Error::Full));
                        } else {
                            prop_assert_eq!(res, Ok(()));
                            model.push_back(item);
                        }
                    }
                    None => {
                        let res = q.try_receive();
                        prop_assert_eq!(res.ok(), model.pop_front());
                    }
                }
                prop_assert!(q.len() <= q.capacity());
                prop_assert_eq!(q.len(), model.len());
            }
        }
    }
}
