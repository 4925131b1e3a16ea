//! # Pending queue: ordered, deduplicated, not-yet-admitted tasks.
//!
//! ## Rules
//! - Insertion order is admission order (FIFO).
//! - An id appears at most once: re-enqueueing removes the old entry and
//!   appends the new one at the back (payload replaced, position reset).
//! - The queue never owns resource handles and never touches capacity.

use std::collections::VecDeque;

use crate::tasks::TaskRef;

/// FIFO of tasks waiting for a capacity slot.
#[derive(Default)]
pub(crate) struct PendingQueue {
    tasks: VecDeque<TaskRef>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `task`, replacing any queued entry with the same id.
    ///
    /// Returns `true` if an older entry was replaced.
    pub fn enqueue(&mut self, task: TaskRef) -> bool {
        let replaced = self.remove_by_id(task.id());
        self.tasks.push_back(task);
        replaced
    }

    /// Removes and returns the task at the head.
    pub fn dequeue_front(&mut self) -> Option<TaskRef> {
        self.tasks.pop_front()
    }

    /// Removes the entry with `id`, if any. Returns whether one was removed.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        match self.tasks.iter().position(|t| t.id() == id) {
            Some(idx) => {
                self.tasks.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Empties the queue, returning how many tasks were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.tasks.len();
        self.tasks.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids in queue order.
    #[cfg(test)]
    pub fn ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id().to_owned()).collect()
    }
}
