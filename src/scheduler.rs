//! # Scheduler
//!
//! Round-robin selection over a single FIFO ready list.
//!
//! The scheduler never initiates a switch. Primitives move tasks between
//! lists and raise a switch request; the trampoline in
//! [`switch`](crate::switch) consumes the request and calls
//! [`Scheduler::select_next`], which always resumes the ready-list head.
//!
//! ## Handoff protocol
//!
//! 1. The running task moves itself (block) or a waiter and itself (wake)
//!    onto the appropriate lists, remove-before-insert.
//! 2. It raises a switch request and suspends.
//! 3. `select_next(saved)` stores `saved` into the outgoing task, pops the
//!    ready head, marks it Running and returns its context handle.
//!
//! Because every suspending operation enqueues a task on the ready list
//! before suspending, an empty ready list at step 3 means the kernel state
//! is corrupt.

use crate::config::MAX_TASKS;
use crate::error::{Error, Result};
use crate::list::TaskList;
use crate::task::{ContextHandle, TaskControlBlock, TaskId, TaskState};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// Task table, ready list and the identity of the running task.
pub struct Scheduler {
    /// Fixed-size array of TCBs. Slots past `task_count` are unused.
    tasks: [TaskControlBlock; MAX_TASKS],

    /// Number of registered tasks.
    task_count: usize,

    /// Tasks eligible to run next, in FIFO order.
    ready: TaskList,

    /// The task currently executing, `None` before the first dispatch.
    current: Option<TaskId>,

    /// Set by block/wake/yield, consumed by the trampoline.
    switch_requested: bool,

    /// Context switches performed since the last reset.
    switch_count: u32,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            task_count: 0,
            ready: TaskList::new(),
            current: None,
            switch_requested: false,
            switch_count: 0,
        }
    }

    /// Register a new task. Only valid during initialization.
    ///
    /// The task is immediately appended to the ready list.
    ///
    /// # Errors
    /// [`Error::Full`] when all `MAX_TASKS` slots are taken.
    pub fn create_task(&mut self, name: &'static str) -> Result<TaskId> {
        if self.task_count >= MAX_TASKS {
            return Err(Error::Full);
        }

        let id = TaskId(self.task_count as u8);
        self.tasks[id.index()].init(id, name);
        self.task_count += 1;
        self.ready.append(&mut self.tasks[..self.task_count], id)?;

        debug!("[CREATE] task {} ({=str})", id.index(), name);
        Ok(id)
    }

    /// Reinitialize every task and repopulate the ready list in task-id
    /// order. No task is running afterwards.
    ///
    /// Pending lists are owned by the primitives and must be cleared by them
    /// in the same reset, since this unlinks every node.
    pub fn reset(&mut self) -> Result<()> {
        self.ready.clear();
        for i in 0..self.task_count {
            self.tasks[i].reset();
        }
        for i in 0..self.task_count {
            let id = self.tasks[i].id;
            self.ready.append(&mut self.tasks[..self.task_count], id)?;
        }
        self.current = None;
        self.switch_requested = false;
        self.switch_count = 0;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Start the first task: pop the ready head with nothing to save.
    ///
    /// # Errors
    /// [`Error::Corrupt`] if a task is already running or none is ready.
    pub fn invoke_first_task(&mut self) -> Result<ContextHandle> {
        if self.current.is_some() {
            return Err(Error::Corrupt);
        }
        self.dispatch_head()
    }

    /// Select the next task to run.
    ///
    /// Stores `saved` into the outgoing task (if any), pops the ready-list
    /// head, marks it current and returns its context handle.
    ///
    /// # Errors
    /// [`Error::Corrupt`] if the ready list is empty.
    pub fn select_next(&mut self, saved: ContextHandle) -> Result<ContextHandle> {
        if let Some(prev) = self.current {
            let tcb = &mut self.tasks[prev.index()];
            tcb.context = saved;
            if tcb.state == TaskState::Running {
                // Suspended without being placed on any list.
                return Err(Error::Corrupt);
            }
        }
        self.switch_count = self.switch_count.wrapping_add(1);
        self.dispatch_head()
    }

    fn dispatch_head(&mut self) -> Result<ContextHandle> {
        let next = self
            .ready
            .pop_head(&mut self.tasks[..self.task_count])
            .map_err(|_| Error::Corrupt)?;

        let tcb = &mut self.tasks[next.index()];
        tcb.state = TaskState::Running;
        self.current = Some(next);

        trace!("[SELECT] task {}", next.index());
        Ok(tcb.context)
    }

    /// Consume the pending switch request, returning whether one was set.
    pub fn take_switch_request(&mut self) -> bool {
        core::mem::replace(&mut self.switch_requested, false)
    }

    // -----------------------------------------------------------------------
    // List moves on behalf of the running task
    // -----------------------------------------------------------------------

    fn running(&self) -> Result<TaskId> {
        match self.current {
            Some(id) if self.tasks[id.index()].is_running() => Ok(id),
            _ => Err(Error::Corrupt),
        }
    }

    /// Park the running task on `pending` and request a switch.
    pub fn block_current(&mut self, pending: &mut TaskList) -> Result<()> {
        let id = self.running()?;
        pending.append(&mut self.tasks[..self.task_count], id)?;
        self.tasks[id.index()].state = TaskState::Blocked;
        self.switch_requested = true;

        trace!("[BLOCK] task {}", id.index());
        Ok(())
    }

    /// Move the head of `pending` to the ready list, then re-enqueue the
    /// running task behind it and request a switch.
    ///
    /// The waker always yields, even if the woken task will find its
    /// condition unsatisfied and block again.
    ///
    /// # Errors
    /// [`Error::Corrupt`] if there is no running task or `pending` is empty
    /// while its owner counted a waiter.
    pub fn wake_one(&mut self, pending: &mut TaskList) -> Result<TaskId> {
        let me = self.running()?;
        let tasks = &mut self.tasks[..self.task_count];

        let waiter = pending.pop_head(tasks).map_err(|_| Error::Corrupt)?;
        self.ready.append(tasks, waiter)?;
        tasks[waiter.index()].state = TaskState::Ready;

        self.ready.append(tasks, me)?;
        tasks[me.index()].state = TaskState::Ready;
        self.switch_requested = true;

        trace!("[WAKE] task {} woke task {}", me.index(), waiter.index());
        Ok(waiter)
    }

    /// Re-enqueue the running task on the ready list and request a switch.
    pub fn yield_current(&mut self) -> Result<()> {
        let id = self.running()?;
        self.ready.append(&mut self.tasks[..self.task_count], id)?;
        self.tasks[id.index()].state = TaskState::Ready;
        self.switch_requested = true;

        trace!("[YIELD] task {}", id.index());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.task_count
    }

    #[inline]
    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    #[inline]
    pub fn ready(&self) -> &TaskList {
        &self.ready
    }

    /// The registered task table.
    #[inline]
    pub fn tasks(&self) -> &[TaskControlBlock] {
        &self.tasks[..self.task_count]
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskControlBlock> {
        self.tasks().get(id.index())
    }

    /// Verify the ready list bookkeeping.
    pub fn check(&self) -> Result<()> {
        self.ready.check(self.tasks())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
