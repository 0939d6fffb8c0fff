//! Helpers shared by the integration tests of the simulation crates.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use simcore::{Component, ComponentId, Resume, Scheduler, SimError, Simulation, State};

/// Events received by a [`Probe`], each with the simulated time it was processed at.
pub type Trace<T> = Rc<RefCell<Vec<(f64, T)>>>;

/// A component that does nothing but record the events it receives.
///
/// It is meant to stand in for a waiting process: hand out continuations from
/// [`labelled`] to resources, and then check in which order and at what time they fired.
pub struct Probe<T> {
    trace: Trace<T>,
}

impl<T> Probe<T> {
    /// Constructs a probe writing into `trace`.
    pub fn new(trace: Trace<T>) -> Self {
        Self { trace }
    }
}

impl<T: fmt::Debug + 'static> Component for Probe<T> {
    type Event = T;

    fn process_event(
        &mut self,
        _: ComponentId<T>,
        event: T,
        scheduler: &mut Scheduler,
        _: &mut State,
    ) -> Result<(), SimError> {
        self.trace.borrow_mut().push((scheduler.time(), event));
        Ok(())
    }
}

/// Continuation delivering the granted value, tagged with `label`, to a probe of pairs.
pub fn labelled<L, V>(id: ComponentId<(L, V)>, label: L) -> Resume<V>
where
    L: fmt::Debug + 'static,
    V: fmt::Debug + 'static,
{
    Resume::new(id, move |value| (label, value))
}

/// Registers a new probe in `sim` and returns its ID together with the trace it records into.
pub fn probe<T: fmt::Debug + 'static>(sim: &mut Simulation) -> (ComponentId<T>, Trace<T>) {
    let trace: Trace<T> = Rc::default();
    let id = sim.add_component(Probe::new(Rc::clone(&trace)));
    (id, trace)
}

/// Returns only the events of a trace, dropping the times.
pub fn events<T: Clone>(trace: &Trace<T>) -> Vec<T> {
    trace.borrow().iter().map(|(_, e)| e.clone()).collect()
}
