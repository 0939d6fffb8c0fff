//! Synchronization primitives shared by components.
//!
//! Every acquisition takes a [`Resume`](crate::Resume) continuation. It fires right away (as an
//! event at the current time) if the request can be satisfied, and later otherwise. Requests are
//! never withdrawn.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

mod container;
mod filtered;
mod pool;
mod priority;

pub use container::Container;
pub use filtered::{FilteredPriorityPool, Identified, Selector};
pub use pool::Pool;
pub use priority::{PriorityResource, Slot};

/// Ordering key of a waiting request: lower priority value first, then earlier request time, then
/// submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestKey {
    priority: i32,
    time: OrderedFloat<f64>,
    seq: u64,
}

impl RequestKey {
    /// Priority of the request; lower values are served first.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Simulation time at which the request was made.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time.into_inner()
    }
}

/// Waiting requests sorted by [`RequestKey`].
#[derive(Debug)]
pub(crate) struct RequestQueue<V> {
    waiting: BTreeMap<RequestKey, V>,
    next_seq: u64,
}

impl<V> Default for RequestQueue<V> {
    fn default() -> Self {
        Self {
            waiting: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<V> RequestQueue<V> {
    pub(crate) fn push(&mut self, priority: i32, time: f64, value: V) -> RequestKey {
        let key = RequestKey {
            priority,
            time: OrderedFloat(time),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.waiting.insert(key, value);
        key
    }

    pub(crate) fn pop_first(&mut self) -> Option<(RequestKey, V)> {
        let key = *self.waiting.keys().next()?;
        self.waiting.remove(&key).map(|value| (key, value))
    }

    pub(crate) fn get(&self, key: &RequestKey) -> Option<&V> {
        self.waiting.get(key)
    }

    pub(crate) fn remove(&mut self, key: &RequestKey) -> Option<V> {
        self.waiting.remove(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&RequestKey, &V)> {
        self.waiting.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiting.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_queue_order() {
        let mut queue = RequestQueue::default();
        queue.push(0, 1.0, "normal-early");
        queue.push(-1, 2.0, "special-late");
        queue.push(0, 0.5, "normal-earliest");
        queue.push(-1, 2.0, "special-late-second");
        queue.push(-3, 3.0, "maintenance");
        assert_eq!(queue.len(), 5);
        let order: Vec<_> = std::iter::from_fn(|| queue.pop_first())
            .map(|(_, v)| v)
            .collect();
        assert_eq!(
            order,
            vec![
                "maintenance",
                "special-late",
                "special-late-second",
                "normal-earliest",
                "normal-early"
            ]
        );
        assert!(queue.is_empty());
    }
}
