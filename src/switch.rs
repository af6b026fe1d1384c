//! # Context Switch Trampoline
//!
//! The cooperative transfer primitive. Each task's saved context is a
//! pinned future in a per-repetition context arena, and a
//! [`ContextHandle`](crate::task::ContextHandle) indexes that arena.
//!
//! A task switches out by awaiting [`Suspend`], which returns `Pending`
//! exactly once. Control falls back into [`start`], which asks the
//! scheduler for the next handle and resumes that context. When the task
//! is selected again its `Suspend` completes and execution continues right
//! after the switch point, exactly like a stack switch returning.
//!
//! ```text
//!   start()
//!     └─► invoke_first_task() ─► poll ctx[h]
//!            ▲                      │ Pending (switch requested)
//!            │                      ▼
//!            └──── poll ctx[h'] ◄── select_next(h) = h'
//!                                   │ Ready(result)
//!                                   ▼
//!                              return to driver
//! ```
//!
//! No waker is involved: a suspended task becomes runnable only by being
//! moved to the ready list, so the waker handed to `poll` does nothing.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::probe::CycleClock;

/// A task's saved context: its entry future, pinned for the repetition.
///
/// Completing the future (with `Ok` or an error) returns control to the
/// driver and ends the repetition.
pub type TaskContext<'a> = Pin<&'a mut dyn Future<Output = Result<()>>>;

// ---------------------------------------------------------------------------
// Suspension point
// ---------------------------------------------------------------------------

/// Yields to the trampoline once, then completes.
#[derive(Debug, Default)]
pub(crate) struct Suspend {
    resumed: bool,
}

impl Suspend {
    pub(crate) const fn new() -> Self {
        Self { resumed: false }
    }
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.resumed {
            Poll::Ready(())
        } else {
            self.resumed = true;
            Poll::Pending
        }
    }
}

// ---------------------------------------------------------------------------
// Trampoline
// ---------------------------------------------------------------------------

/// Run the task set from the ready-list head until a task returns.
///
/// `contexts[i]` must be the context of the task whose handle is `i`.
///
/// # Errors
/// Whatever the returning task produced, or [`Error::Corrupt`] if the
/// scheduler hands out a handle with no context or a task suspends without
/// requesting a switch.
pub fn start<C: CycleClock>(kernel: &Kernel<C>, contexts: &mut [TaskContext<'_>]) -> Result<()> {
    let mut cx = Context::from_waker(Waker::noop());

    let mut handle = kernel.invoke_first_task()?;
    loop {
        let context = contexts.get_mut(handle.index()).ok_or(Error::Corrupt)?;
        match context.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => handle = kernel.context_switch(handle)?,
        }
    }
}
