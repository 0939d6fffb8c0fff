use std::collections::HashSet;

use super::RequestQueue;
use crate::{Resume, Scheduler, SimError};

/// A slot granted by a [`PriorityResource`]. Hand it back with [`PriorityResource::release`].
///
/// Slots are neither `Clone` nor `Copy`, so a grant cannot be released twice by accident.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    id: u64,
}

/// Resource with a fixed number of interchangeable slots.
///
/// Requesters that cannot be served immediately wait in priority order (lower value first,
/// ties by request time and then submission order). A holder is never preempted.
#[derive(Debug)]
pub struct PriorityResource {
    capacity: usize,
    holders: HashSet<u64>,
    waiting: RequestQueue<Resume<Slot>>,
    next_slot: u64,
}

impl PriorityResource {
    /// Creates a resource with `capacity` slots, all free.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            holders: HashSet::with_capacity(capacity),
            waiting: RequestQueue::default(),
            next_slot: 0,
        }
    }

    /// Requests a slot with the given `priority`. `resume` fires with the slot once granted.
    pub fn request(&mut self, priority: i32, resume: Resume<Slot>, scheduler: &mut Scheduler) {
        self.waiting.push(priority, scheduler.time(), resume);
        self.grant(scheduler);
    }

    /// Releases a previously granted slot, and grants it to the next waiting request, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::CapacityExceeded`] if the slot is not currently held, as releasing it
    /// would leave more free slots than the declared capacity.
    pub fn release(&mut self, slot: Slot, scheduler: &mut Scheduler) -> Result<(), SimError> {
        if !self.holders.remove(&slot.id) {
            return Err(SimError::CapacityExceeded(format!(
                "released slot {} that is not held",
                slot.id
            )));
        }
        self.grant(scheduler);
        Ok(())
    }

    fn grant(&mut self, scheduler: &mut Scheduler) {
        while self.holders.len() < self.capacity {
            match self.waiting.pop_first() {
                Some((_, resume)) => {
                    let id = self.next_slot;
                    self.next_slot += 1;
                    self.holders.insert(id);
                    resume.resume(Slot { id }, scheduler);
                }
                None => break,
            }
        }
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.holders.len()
    }

    /// Number of requests waiting for a slot.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }
}
