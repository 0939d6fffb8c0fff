use std::any::Any;
use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::{Clock, ComponentId, SimError};

/// Identifies a scheduled event.
///
/// IDs are assigned from a monotonically increasing counter, and they break ties between events
/// scheduled for the same time: the one created first fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

/// Entry type stored in the scheduler, including the event value, component ID, and the time when
/// it is supposed to occur.
#[derive(Debug)]
pub struct EventEntry {
    key: Reverse<(OrderedFloat<f64>, EventId)>,
    component: usize,
    inner: Box<dyn Any>,
}

impl EventEntry {
    /// The time at which the event fires.
    #[must_use]
    pub fn time(&self) -> f64 {
        (self.key.0).0.into_inner()
    }

    /// The ID assigned to the event when it was scheduled.
    #[must_use]
    pub fn id(&self) -> EventId {
        (self.key.0).1
    }

    pub(crate) fn component_idx(&self) -> usize {
        self.component
    }

    /// Tries to downcast the event entry to one holding an event of type `E`.
    /// If fails, returns `None`.
    #[must_use]
    pub fn downcast<E: fmt::Debug + 'static>(&self) -> Option<EventEntryTyped<'_, E>> {
        self.inner
            .downcast_ref::<E>()
            .map(|event| EventEntryTyped {
                time: self.time(),
                id: self.id(),
                component_id: ComponentId::new(self.component),
                event,
            })
    }

    /// Consumes the entry and returns the owned event, or `None` if it holds a different type.
    pub(crate) fn into_event<E: 'static>(self) -> Option<E> {
        self.inner.downcast::<E>().ok().map(|event| *event)
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Borrowed view of an [`EventEntry`] whose event type is known.
#[derive(Debug)]
pub struct EventEntryTyped<'e, E: fmt::Debug> {
    /// Time at which the event fires.
    pub time: f64,
    /// Event ID.
    pub id: EventId,
    /// Component the event is addressed to.
    pub component_id: ComponentId<E>,
    /// The event itself.
    pub event: &'e E,
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Debug, Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
pub struct Scheduler {
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    next_id: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: Rc::new(Cell::new(0.0)),
            next_id: 0,
        }
    }
}

impl Scheduler {
    /// Schedules `event` to be executed for `component` at `self.time() + delay`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDelay`] if `delay` is negative, NaN, or infinite.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: f64,
        component: ComponentId<E>,
        event: E,
    ) -> Result<EventId, SimError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidDelay(delay));
        }
        let time = self.time() + delay;
        Ok(self.push(time, component, event))
    }

    /// Schedules `event` to be executed for `component` at `self.time()`.
    ///
    /// The event still goes through the queue: it runs after every event already scheduled for
    /// the current time.
    pub fn schedule_immediately<E: fmt::Debug + 'static>(
        &mut self,
        component: ComponentId<E>,
        event: E,
    ) -> EventId {
        self.push(self.time(), component, event)
    }

    fn push<E: fmt::Debug + 'static>(
        &mut self,
        time: f64,
        component: ComponentId<E>,
        event: E,
    ) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(EventEntry {
            key: Reverse((OrderedFloat(time), id)),
            component: component.idx(),
            inner: Box::new(event),
        });
        id
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Returns the time of the earliest pending event without removing it.
    #[must_use]
    pub fn peek_time(&self) -> Option<f64> {
        self.events.peek().map(EventEntry::time)
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Answers whether there are no pending events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes and returns the next scheduled event or `None` if none are left.
    /// The clock is advanced to the time of the returned event.
    pub fn pop(&mut self) -> Option<EventEntry> {
        self.events.pop().map(|e| {
            self.clock.replace(e.time());
            e
        })
    }

    /// Moves the clock forward to `time` without processing anything. Never moves it back.
    pub(crate) fn advance_to(&mut self, time: f64) {
        if time > self.clock.get() {
            self.clock.replace(time);
        }
    }
}
