//! Event-flag group.
//!
//! A 32-bit mask of flags. `set` ORs bits in and wakes one waiter; `get`
//! waits for all (AND) or any (OR) of the requested bits and optionally
//! clears the ones it matched.
//!
//! `set` does not look at what the waiter asked for. The woken task
//! re-validates its own condition and blocks again if it is still unmet.

use core::cell::RefCell;
use core::ops::BitOr;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::list::TaskList;
use crate::probe::{CycleClock, WakePath};
use crate::sync::Wait;

/// Flag mask carried by an [`EventGroup`].
pub type EventBits = u32;

/// How `get` matches the requested bits. Combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventCondition(u8);

impl EventCondition {
    /// Every requested bit must be set.
    pub const AND: Self = Self(1 << 0);
    /// At least one requested bit must be set.
    pub const OR: Self = Self(1 << 1);
    /// Clear the matched bits when the condition holds.
    pub const CLEAR: Self = Self(1 << 2);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `matched` (the requested bits found set) satisfies the
    /// condition for a request of `wanted`.
    #[inline]
    pub const fn is_met(self, wanted: EventBits, matched: EventBits) -> bool {
        (self.contains(Self::AND) && matched == wanted)
            || (self.contains(Self::OR) && matched != 0)
    }
}

impl BitOr for EventCondition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

struct State {
    mask: EventBits,
    pending_count: u32,
    pending: TaskList,
}

pub struct EventGroup {
    state: RefCell<State>,
}

impl EventGroup {
    pub const fn new() -> Self {
        Self {
            state: RefCell::new(State {
                mask: 0,
                pending_count: 0,
                pending: TaskList::new(),
            }),
        }
    }

    /// Clear every flag and forget every waiter. Pair with a scheduler reset.
    pub fn reset(&mut self) {
        let st = self.state.get_mut();
        st.mask = 0;
        st.pending_count = 0;
        st.pending.clear();
    }

    pub fn mask(&self) -> EventBits {
        self.state.borrow().mask
    }

    pub fn pending_count(&self) -> u32 {
        self.state.borrow().pending_count
    }

    /// Clear `bits` without waking anyone.
    pub fn clear(&self, bits: EventBits) {
        self.state.borrow_mut().mask &= !bits;
    }

    /// Check the condition once.
    ///
    /// Returns the matched bits on success, clearing them first if `cond`
    /// includes [`EventCondition::CLEAR`].
    ///
    /// # Errors
    /// [`Error::WouldBlock`] when the condition does not hold.
    pub fn try_get(&self, wanted: EventBits, cond: EventCondition) -> Result<EventBits> {
        let mut st = self.state.borrow_mut();
        let matched = st.mask & wanted;
        if !cond.is_met(wanted, matched) {
            return Err(Error::WouldBlock);
        }
        if cond.contains(EventCondition::CLEAR) {
            st.mask &= !matched;
        }
        Ok(matched)
    }

    /// Wait for `wanted` according to `cond`.
    ///
    /// With [`Wait::Forever`] the caller is parked and re-checks on every
    /// resumption; a `set` of unrelated bits just sends it back to sleep.
    pub async fn get<C: CycleClock>(
        &self,
        kernel: &Kernel<C>,
        wanted: EventBits,
        cond: EventCondition,
        wait: Wait,
    ) -> Result<EventBits> {
        loop {
            match (self.try_get(wanted, cond), wait) {
                (Ok(bits), _) => return Ok(bits),
                (Err(e), Wait::NoWait) => return Err(e),
                (Err(_), Wait::Forever) => {
                    let mut st = self.state.borrow_mut();
                    kernel.block_current(&mut st.pending)?;
                    st.pending_count += 1;
                }
            }
            kernel.switch(WakePath::Event).await;
        }
    }

    /// OR `bits` into the mask. If a task is waiting, move it to the ready
    /// list, queue the caller behind it and switch.
    pub async fn set<C: CycleClock>(&self, kernel: &Kernel<C>, bits: EventBits) -> Result<()> {
        {
            let mut st = self.state.borrow_mut();
            st.mask |= bits;
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

impl Default for EventGroup {
    fn default() -> Self {
        Self::new()
    }
}
