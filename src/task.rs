//! # Task Control Block
//!
//! Defines the task model. The task set is fixed at initialization;
//! every repetition reinitializes the control blocks in place.
//!
//! A task owns exactly one saved-context handle and one list node.
//! Lists only ever hold [`TaskId`]s, never the blocks themselves.

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Index of a task in the scheduler's task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub(crate) u8);

impl TaskId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque saved-context handle.
///
/// Indexes the per-repetition context arena handed to
/// [`switch::start`](crate::switch::start). Each task exclusively owns
/// its slot; the scheduler stores the handle back into the task when the
/// task is switched out and hands it to the trampoline when it is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContextHandle(pub(crate) usize);

impl ContextHandle {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   ┌──────────┐   select_next()   ┌─────────┐
///   │  Ready   │ ────────────────► │ Running │
///   └──────────┘                   └─────────┘
///        ▲  ▲      wake / yield         │
///        │  └───────────────────────────┤
///        │                              │ block
///        │                              ▼
///        │          wake_one()     ┌──────────┐
///        └──────────────────────── │ Blocked  │
///                                  └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// On the ready list, waiting for the trampoline to resume it.
    Ready,
    /// The single task currently executing.
    Running,
    /// On a primitive's pending list.
    Blocked,
}

// ---------------------------------------------------------------------------
// List node
// ---------------------------------------------------------------------------

/// Intrusive singly-linked list node embedded in every task.
///
/// `linked` distinguishes "tail of some list" from "on no list", which
/// `next == None` alone cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListNode {
    pub(crate) next: Option<TaskId>,
    pub(crate) linked: bool,
}

impl ListNode {
    pub const fn new() -> Self {
        Self {
            next: None,
            linked: false,
        }
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    #[inline]
    pub fn next(&self) -> Option<TaskId> {
        self.next
    }
}

impl Default for ListNode {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB).
///
/// TCBs live in a fixed array inside the [`Scheduler`](crate::scheduler::Scheduler).
/// The task's entry point is not stored here: it is the future placed in the
/// context arena slot that `context` refers to.
#[derive(Debug, Clone, Copy)]
pub struct TaskControlBlock {
    /// Index in the scheduler's task table.
    pub id: TaskId,

    /// Human-readable name, used in logs and reports.
    pub name: &'static str,

    /// Current execution state.
    pub state: TaskState,

    /// Saved context. Updated by the scheduler on every switch-out.
    pub context: ContextHandle,

    /// Ready/pending list linkage.
    pub node: ListNode,

    /// Whether this slot holds a registered task.
    pub active: bool,
}

impl TaskControlBlock {
    /// An unregistered slot. Used to initialize the task table.
    pub const EMPTY: Self = Self {
        id: TaskId(0),
        name: "",
        state: TaskState::Ready,
        context: ContextHandle(0),
        node: ListNode::new(),
        active: false,
    };

    /// Register this slot as task `id`.
    pub fn init(&mut self, id: TaskId, name: &'static str) {
        self.id = id;
        self.name = name;
        self.active = true;
        self.reset();
    }

    /// Return the task to its pre-run state: fresh context, off every list.
    ///
    /// The context slot is fixed by the task id, so a fresh arena built in
    /// task-id order lines up with the handles.
    pub fn reset(&mut self) {
        self.state = TaskState::Ready;
        self.context = ContextHandle(self.id.index());
        self.node = ListNode::new();
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcb_initialization() {
        let mut tcb = TaskControlBlock::EMPTY;
        assert!(!tcb.active);

        tcb.init(TaskId(1), "giver");

        assert!(tcb.active);
        assert_eq!(tcb.id, TaskId(1));
        assert_eq!(tcb.name, "giver");
        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.context, ContextHandle(1));
        assert!(!tcb.node.is_linked());
    }

    #[test]
    fn test_reset_restores_context_and_unlinks() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init(TaskId(0), "taker");
        tcb.state = TaskState::Blocked;
        tcb.context = ContextHandle(3);
        tcb.node.linked = true;
        tcb.node.next = Some(TaskId(1));

        tcb.reset();

        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.context, ContextHandle(0));
        assert_eq!(tcb.node, ListNode::new());
    }
}
