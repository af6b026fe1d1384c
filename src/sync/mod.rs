//! # Synchronization Primitives
//!
//! Semaphore, event-flag group and bounded message queue. Each owns a
//! pending list of blocked tasks and is driven through the [`Kernel`]:
//!
//! - the blocking branch of `take`/`get`/`receive` parks the caller and
//!   switches, then re-checks its condition on resumption;
//! - `give`/`set`/`send` wake at most one waiter and always yield behind
//!   it, even if the waiter will find its condition unmet.
//!
//! Waiting is binary: [`Wait::Forever`] or [`Wait::NoWait`]. There are no
//! timeouts and no cancellation.
//!
//! [`Kernel`]: crate::kernel::Kernel

mod event_group;
mod queue;
mod semaphore;

pub use event_group::{EventBits, EventCondition, EventGroup};
pub use queue::MessageQueue;
pub use semaphore::Semaphore;

/// Blocking policy of a request that cannot be satisfied immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wait {
    /// Block until a matching give/set/send wakes the caller.
    Forever,
    /// Fail with [`Error::WouldBlock`](crate::error::Error::WouldBlock).
    NoWait,
}
