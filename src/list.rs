//! # Task Lists
//!
//! Singly-linked FIFO of task references, used both as the scheduler's
//! ready list and as every primitive's pending list.
//!
//! The nodes are embedded in the task control blocks, so every operation
//! takes the task table alongside the list. A task is on at most one list
//! at a time: [`TaskList::append`] refuses a task whose node is still
//! linked, which catches any move that inserts before removing.
//!
//! ```text
//!   head ──► [T0 | next] ──► [T1 | next] ──► None
//!   count = 2
//! ```

use crate::error::{Error, Result};
use crate::task::{TaskControlBlock, TaskId};

/// FIFO list of tasks. Holds only the head reference and a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskList {
    head: Option<TaskId>,
    count: usize,
}

impl TaskList {
    pub const fn new() -> Self {
        Self {
            head: None,
            count: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn head(&self) -> Option<TaskId> {
        self.head
    }

    /// Drop every reference without touching the nodes.
    ///
    /// Only valid while the task table is being reset as well.
    pub fn clear(&mut self) {
        self.head = None;
        self.count = 0;
    }

    /// Insert `id` at the tail.
    ///
    /// # Errors
    /// [`Error::Corrupt`] if the task is already on a list or `id` is not in
    /// the table.
    pub fn append(&mut self, tasks: &mut [TaskControlBlock], id: TaskId) -> Result<()> {
        if tasks.get(id.index()).ok_or(Error::Corrupt)?.node.linked {
            return Err(Error::Corrupt);
        }

        let tail = match self.head {
            None => None,
            Some(head) => {
                let mut tail = head;
                // A well-formed list has at most `tasks.len()` nodes.
                for _ in 0..tasks.len() {
                    match tasks[tail.index()].node.next {
                        Some(next) => tail = next,
                        None => break,
                    }
                }
                if tasks[tail.index()].node.next.is_some() {
                    return Err(Error::Corrupt);
                }
                Some(tail)
            }
        };

        let node = &mut tasks[id.index()].node;
        node.next = None;
        node.linked = true;
        match tail {
            None => self.head = Some(id),
            Some(tail) => tasks[tail.index()].node.next = Some(id),
        }

        self.count += 1;
        Ok(())
    }

    /// Remove and return the head.
    ///
    /// # Errors
    /// [`Error::Empty`] when there is nothing to pop.
    pub fn pop_head(&mut self, tasks: &mut [TaskControlBlock]) -> Result<TaskId> {
        let id = self.head.ok_or(Error::Empty)?;
        let node = &mut tasks.get_mut(id.index()).ok_or(Error::Corrupt)?.node;

        self.head = node.next.take();
        node.linked = false;
        self.count = self.count.checked_sub(1).ok_or(Error::Corrupt)?;
        Ok(id)
    }

    /// Iterate the list from head to tail.
    pub fn iter<'a>(&self, tasks: &'a [TaskControlBlock]) -> Iter<'a> {
        Iter {
            tasks,
            cursor: self.head,
            remaining: tasks.len(),
        }
    }

    /// Count the nodes reachable from the head.
    ///
    /// # Errors
    /// [`Error::Corrupt`] if the chain is longer than the task table
    /// (a cycle) or reaches a node not marked linked.
    pub fn reachable(&self, tasks: &[TaskControlBlock]) -> Result<usize> {
        let mut n = 0;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = &tasks.get(id.index()).ok_or(Error::Corrupt)?.node;
            if !node.linked || n == tasks.len() {
                return Err(Error::Corrupt);
            }
            n += 1;
            cursor = node.next;
        }
        Ok(n)
    }

    /// Check `count == reachable`.
    pub fn check(&self, tasks: &[TaskControlBlock]) -> Result<()> {
        if self.reachable(tasks)? == self.count {
            Ok(())
        } else {
            Err(Error::Corrupt)
        }
    }
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new()
    }
}

/// Head-to-tail iterator over a [`TaskList`]. Stops after as many steps as
/// there are tasks, so a corrupted (cyclic) list cannot hang it.
pub struct Iter<'a> {
    tasks: &'a [TaskControlBlock],
    cursor: Option<TaskId>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = TaskId;

    fn next(&mut self) -> Option<TaskId> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.cursor?;
        self.remaining -= 1;
        self.cursor = self.tasks.get(id.index()).and_then(|t| t.node.next);
        Some(id)
    }
}
