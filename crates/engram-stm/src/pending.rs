//! FIFO queue of promotion candidates.

use std::collections::VecDeque;

use engram_types::PendingItem;

use crate::error::StmError;

/// Bounded FIFO queue. Strict arrival order; priority is applied at
/// evaluation time, never here.
#[derive(Debug, Clone)]
pub struct PendingQueue {
    items: VecDeque<PendingItem>,
    max_size: usize,
}

impl PendingQueue {
    /// Create an empty queue with the given capacity.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(max_size.min(4096)),
            max_size: max_size.max(1),
        }
    }

    /// Append a candidate at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::QueueFull`] at capacity; the queue is unchanged.
    pub fn enqueue(&mut self, item: PendingItem) -> Result<(), StmError> {
        if self.items.len() == self.max_size {
            return Err(StmError::QueueFull {
                max_size: self.max_size,
            });
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Remove and return the head, if any.
    pub fn dequeue(&mut self) -> Option<PendingItem> {
        self.items.pop_front()
    }

    /// Non-destructive view of the head.
    #[must_use]
    pub fn peek(&self) -> Option<&PendingItem> {
        self.items.front()
    }

    /// Number of queued candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Queued candidates in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingItem> {
        self.items.iter()
    }
}
