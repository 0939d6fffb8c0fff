use std::fmt;

use crate::{ComponentId, Scheduler};

/// A one-shot continuation of a suspended component.
///
/// Resources and joins hold these for their waiters. Firing it with the granted value schedules
/// an event for the waiting component at the current time, so every resumption goes through the
/// event queue. Firing consumes the value, and therefore a wait is satisfied at most once.
pub struct Resume<T>(Box<dyn FnOnce(T, &mut Scheduler)>);

impl<T> Resume<T> {
    /// Creates a continuation that resumes `component` with the event built by `make_event`
    /// from the granted value.
    pub fn new<E, F>(component: ComponentId<E>, make_event: F) -> Self
    where
        E: fmt::Debug + 'static,
        F: FnOnce(T) -> E + 'static,
    {
        Self(Box::new(move |value, scheduler: &mut Scheduler| {
            scheduler.schedule_immediately(component, make_event(value));
        }))
    }

    /// Creates a continuation from an arbitrary function of the granted value.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(T, &mut Scheduler) + 'static,
    {
        Self(Box::new(f))
    }

    /// Fires the continuation with `value`.
    pub fn resume(self, value: T, scheduler: &mut Scheduler) {
        (self.0)(value, scheduler);
    }
}

impl<T> fmt::Debug for Resume<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resume(..)")
    }
}
