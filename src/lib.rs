//! # ctxbench: Cooperative Context-Switch Latency Benchmark
//!
//! A minimal cooperative kernel for single-core bare-metal targets, built
//! only to measure how many cycles it takes for a task blocked on a
//! synchronization primitive to resume after another task wakes it.
//!
//! ## Overview
//!
//! Two tasks run a fixed script over three primitives. The waking task
//! samples the cycle counter right before handing over the CPU; the woken
//! task samples it again right after its switch point returns. The
//! difference, minus the calibrated cost of a counter read, is attributed
//! to one of four wake paths:
//!
//! | Path | Resume point |
//! |------|--------------|
//! | `semaphore_give` | blocked `Semaphore::take` after a `give` |
//! | `event_set` | blocked `EventGroup::get` after a `set` |
//! | `queue_send` | blocked `MessageQueue::receive` after a `send` |
//! | `task_yield` | a waker or yielder getting the CPU back |
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              Benchmark Driver (bench.rs)               │
//! │    reset() · run_once() · run() · verify() · costs()   │
//! ├────────────────────────────────────────────────────────┤
//! │        Sync Primitives (sync/)                         │
//! │   Semaphore · EventGroup · MessageQueue                │
//! ├──────────────┬─────────────────────┬───────────────────┤
//! │   Kernel     │    Scheduler        │  Probe            │
//! │   kernel.rs  │    scheduler.rs     │  probe.rs         │
//! │  ─ switch()  │   ─ select_next()   │  ─ arm()          │
//! │  ─ yield_now │   ─ block/wake      │  ─ record()       │
//! ├──────────────┴─────────────────────┴───────────────────┤
//! │    Task Model (task.rs) · Task Lists (list.rs)         │
//! │        TCB · ListNode · TaskState · TaskList           │
//! ├────────────────────────────────────────────────────────┤
//! │          Context Switch Trampoline (switch.rs)         │
//! │        pinned task futures · Suspend · start()         │
//! ├────────────────────────────────────────────────────────┤
//! │   Arch (arch/)  DWT CYCCNT on Cortex-M4 · SimClock     │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling Model
//!
//! - **Cooperative**: a task runs until it blocks, wakes another task or
//!   yields. There is no tick and no preemption.
//! - **FIFO**: the ready list is served head first. A waker is appended
//!   behind the task it woke, so the woken task always runs next.
//! - **Single list membership**: every task is on at most one list, or
//!   running. Inserting a task that is already linked is reported as
//!   [`Error::Corrupt`].
//!
//! ## Memory Model
//!
//! - **No heap**: every table and ring is a fixed-size array
//! - **No globals**: the driver owns the kernel, which owns the scheduler
//! - **Task contexts**: pinned futures on the driver's stack, one arena per
//!   repetition

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod arch;
pub mod bench;
pub mod config;
pub mod error;
pub mod kernel;
pub mod list;
pub mod probe;
pub mod scheduler;
pub mod switch;
pub mod sync;
pub mod task;

pub use bench::{Benchmark, FinalState};
pub use config::BenchConfig;
pub use error::{Error, Result};
pub use kernel::Kernel;
pub use probe::{CycleClock, Cycles, PathStats, WakeCosts, WakePath};
