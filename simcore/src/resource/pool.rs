use std::collections::VecDeque;

use crate::{Resume, Scheduler, SimError};

/// Bounded store of interchangeable items.
///
/// Items are handed out in FIFO order, and so are waiting requests: an item put into the pool
/// goes straight to the longest-waiting request if there is one.
#[derive(Debug)]
pub struct Pool<T> {
    items: VecDeque<T>,
    waiting: VecDeque<Resume<T>>,
    capacity: usize,
}

impl<T> Pool<T> {
    /// Creates an empty pool that can store up to `capacity` items.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            waiting: VecDeque::new(),
            capacity,
        }
    }

    /// Takes an item out of the pool. `resume` fires with the item once one is available.
    pub fn get(&mut self, resume: Resume<T>, scheduler: &mut Scheduler) {
        // Items are only ever stored while nobody waits, so a stored item can be handed out.
        match self.items.pop_front() {
            Some(item) => resume.resume(item, scheduler),
            None => self.waiting.push_back(resume),
        }
    }

    /// Puts an item into the pool, handing it directly to the longest-waiting request if any.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::CapacityExceeded`] if the pool is full.
    pub fn put(&mut self, item: T, scheduler: &mut Scheduler) -> Result<(), SimError> {
        if let Some(resume) = self.waiting.pop_front() {
            resume.resume(item, scheduler);
            Ok(())
        } else if self.items.len() < self.capacity {
            self.items.push_back(item);
            Ok(())
        } else {
            Err(SimError::CapacityExceeded(format!(
                "pool of capacity {} is full",
                self.capacity
            )))
        }
    }

    /// Returns the number of items currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Answers whether no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of requests waiting for an item.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    /// Maximum number of stored items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
