use std::fmt;

use super::{RequestKey, RequestQueue};
use crate::{Resume, Scheduler, SimError};

/// Items that can be told apart by an ID.
pub trait Identified {
    /// Type of the ID.
    type Id: Copy + Eq + fmt::Debug;

    /// The item's ID.
    fn id(&self) -> Self::Id;
}

/// Predicate restricting which items a request accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<I> {
    /// Accepts any item.
    Any,
    /// Accepts only the item with this ID.
    Id(I),
}

impl<I: Eq + Copy> Selector<I> {
    /// Answers whether `item` satisfies the selector.
    pub fn accepts<T: Identified<Id = I>>(&self, item: &T) -> bool {
        match self {
            Selector::Any => true,
            Selector::Id(id) => item.id() == *id,
        }
    }
}

/// Store of identifiable items combining priority-ordered waiting with per-request selectors.
///
/// Whenever an item is put or a request is made, waiting requests are visited in priority order
/// (lower value first, ties by request time and then submission order), and each receives the
/// first stored item its selector accepts. Items no request accepts stay stored, and requests
/// that match nothing keep waiting.
#[derive(Debug)]
pub struct FilteredPriorityPool<T: Identified> {
    items: Vec<T>,
    waiting: RequestQueue<(Selector<T::Id>, Resume<T>)>,
    capacity: usize,
}

impl<T: Identified> FilteredPriorityPool<T> {
    /// Creates an empty pool that can store up to `capacity` items.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            waiting: RequestQueue::default(),
            capacity,
        }
    }

    /// Requests an item accepted by `selector`, with the given `priority`.
    /// `resume` fires with the item once it is granted.
    pub fn get(
        &mut self,
        priority: i32,
        selector: Selector<T::Id>,
        resume: Resume<T>,
        scheduler: &mut Scheduler,
    ) {
        self.waiting
            .push(priority, scheduler.time(), (selector, resume));
        self.dispatch(scheduler);
    }

    /// Puts an item into the pool and grants it to the first waiting request accepting it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::CapacityExceeded`] if the pool is already full.
    pub fn put(&mut self, item: T, scheduler: &mut Scheduler) -> Result<(), SimError> {
        if self.items.len() >= self.capacity {
            return Err(SimError::CapacityExceeded(format!(
                "filtered pool of capacity {} is full, cannot put {:?}",
                self.capacity,
                item.id()
            )));
        }
        self.items.push(item);
        self.dispatch(scheduler);
        Ok(())
    }

    fn dispatch(&mut self, scheduler: &mut Scheduler) {
        let keys: Vec<RequestKey> = self.waiting.iter().map(|(key, _)| *key).collect();
        for key in keys {
            if self.items.is_empty() {
                break;
            }
            let position = self.waiting.get(&key).and_then(|(selector, _)| {
                self.items.iter().position(|item| selector.accepts(item))
            });
            if let Some(idx) = position {
                let item = self.items.remove(idx);
                if let Some((_, resume)) = self.waiting.remove(&key) {
                    resume.resume(item, scheduler);
                }
            }
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

    /// Answers whether an item with this ID is currently stored.
    #[must_use]
    pub fn contains(&self, id: T::Id) -> bool {
        self.items.iter().any(|item| item.id() == id)
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

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Item(u8);

    impl Identified for Item {
        type Id = u8;
        fn id(&self) -> u8 {
            self.0
        }
    }

    type Got = Rc<RefCell<Vec<(&'static str, Item)>>>;

    fn collect(got: &Got, who: &'static str) -> Resume<Item> {
        let got = Rc::clone(got);
        Resume::from_fn(move |item, _: &mut Scheduler| got.borrow_mut().push((who, item)))
    }

    #[test]
    fn test_selector() {
        assert!(Selector::Any.accepts(&Item(3)));
        assert!(Selector::Id(3).accepts(&Item(3)));
        assert!(!Selector::Id(4).accepts(&Item(3)));
    }

    #[test]
    fn test_unmatched_requests_keep_waiting() {
        let mut scheduler = Scheduler::default();
        let got = Got::default();
        let mut pool = FilteredPriorityPool::bounded(3);
        pool.put(Item(0), &mut scheduler).unwrap();
        pool.get(-3, Selector::Id(1), collect(&got, "maintenance"), &mut scheduler);
        assert!(got.borrow().is_empty());
        assert_eq!(pool.queue_len(), 1);
        assert!(pool.contains(0));

        pool.get(0, Selector::Any, collect(&got, "ship"), &mut scheduler);
        assert_eq!(*got.borrow(), vec![("ship", Item(0))]);

        pool.put(Item(1), &mut scheduler).unwrap();
        assert_eq!(got.borrow()[1], ("maintenance", Item(1)));
        assert!(pool.is_empty());
        assert_eq!(pool.queue_len(), 0);
    }

    #[test]
    fn test_put_serves_highest_priority_match() {
        let mut scheduler = Scheduler::default();
        let got = Got::default();
        let mut pool = FilteredPriorityPool::bounded(2);
        pool.get(0, Selector::Any, collect(&got, "normal"), &mut scheduler);
        pool.get(-1, Selector::Any, collect(&got, "special"), &mut scheduler);
        pool.get(-3, Selector::Id(7), collect(&got, "maintenance"), &mut scheduler);
        pool.put(Item(2), &mut scheduler).unwrap();
        pool.put(Item(7), &mut scheduler).unwrap();
        pool.put(Item(5), &mut scheduler).unwrap();
        assert_eq!(
            *got.borrow(),
            vec![
                ("special", Item(2)),
                ("maintenance", Item(7)),
                ("normal", Item(5))
            ]
        );
    }

    #[test]
    fn test_identity_request_skips_other_items() {
        let mut scheduler = Scheduler::default();
        let got = Got::default();
        let mut pool = FilteredPriorityPool::bounded(2);
        pool.get(-3, Selector::Id(1), collect(&got, "first"), &mut scheduler);
        pool.get(0, Selector::Any, collect(&got, "second"), &mut scheduler);
        pool.put(Item(0), &mut scheduler).unwrap();
        assert_eq!(*got.borrow(), vec![("second", Item(0))]);
        pool.put(Item(1), &mut scheduler).unwrap();
        assert_eq!(got.borrow()[1], ("first", Item(1)));
    }

    #[test]
    fn test_full_pool() {
        let mut scheduler = Scheduler::default();
        let mut pool = FilteredPriorityPool::bounded(1);
        pool.put(Item(0), &mut scheduler).unwrap();
        assert!(matches!(
            pool.put(Item(1), &mut scheduler),
            Err(SimError::CapacityExceeded(_))
        ));
    }
}
