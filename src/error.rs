//! # Errors
//!
//! Every fallible kernel and primitive operation returns [`Result`].
//! The transient kinds are ordinary outcomes a task branches on;
//! [`Error::Corrupt`] means a kernel invariant was broken and the
//! current repetition cannot continue.

use core::fmt;

/// Failure kinds shared by the task lists, the scheduler and the
/// synchronization primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Pop from an empty task list.
    Empty,
    /// Send to a queue at capacity, or task table exhausted.
    Full,
    /// Give on a semaphore already at its maximum count.
    Saturated,
    /// The request could not be satisfied and the caller asked not to wait.
    WouldBlock,
    /// A scheduler or list invariant was violated. Not recoverable.
    Corrupt,
    /// The cycle counter did not advance between two reads.
    ClockFault,
}

impl Error {
    /// Returns `true` for kinds that invalidate the whole repetition.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Error::Corrupt | Error::ClockFault)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Empty => "task list is empty",
            Error::Full => "capacity exhausted",
            Error::Saturated => "semaphore already at max count",
            Error::WouldBlock => "operation would block",
            Error::Corrupt => "kernel invariant violated",
            Error::ClockFault => "cycle counter is not monotonic",
        };
        f.write_str(msg)
    }
}

/// Kernel result type.
pub type Result<T> = core::result::Result<T, Error>;
