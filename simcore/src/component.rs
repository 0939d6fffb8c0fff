use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::{EventEntry, Scheduler, SimError, State};

/// Identifies a simulation component.
///
/// The ID is typed by the event the component processes, so an event of the wrong type cannot be
/// scheduled for it.
pub struct ComponentId<E> {
    id: usize,
    _marker: PhantomData<E>,
}

impl<E> ComponentId<E> {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub(crate) fn idx(self) -> usize {
        self.id
    }
}

impl<E> Clone for ComponentId<E> {
    fn clone(&self) -> Self {
        Self::new(self.id)
    }
}
impl<E> Copy for ComponentId<E> {}

impl<E> PartialEq for ComponentId<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<E> Eq for ComponentId<E> {}

impl<E> fmt::Debug for ComponentId<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.id)
    }
}

/// Interface of a simulation component: a state machine driven by the events scheduled for it.
pub trait Component {
    /// Type of events this component processes.
    type Event: fmt::Debug + 'static;

    /// Processes a single event. Any error aborts the simulation.
    ///
    /// # Errors
    ///
    /// Implementations propagate errors from the scheduler, the state, and the resources.
    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError>;
}

trait ProcessEventEntry {
    fn process_event_entry(
        &mut self,
        entry: EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError>;

    fn as_any(&self) -> &dyn Any;
}

impl<C> ProcessEventEntry for C
where
    C: Component + 'static,
{
    fn process_event_entry(
        &mut self,
        entry: EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let self_id = ComponentId::new(entry.component_idx());
        let event = entry
            .into_event::<C::Event>()
            .expect("component IDs are typed, so the event type always matches");
        self.process_event(self_id, event, scheduler, state)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Container holding type-erased components.
#[derive(Default)]
pub struct Components {
    components: Vec<Box<dyn ProcessEventEntry>>,
}

impl Components {
    /// Registers a new component and returns its ID.
    #[must_use]
    pub fn add_component<E, C>(&mut self, component: C) -> ComponentId<E>
    where
        E: fmt::Debug + 'static,
        C: Component<Event = E> + 'static,
    {
        let id = self.components.len();
        self.components.push(Box::new(component));
        ComponentId::new(id)
    }

    /// Returns a reference to the component registered under `id`, if it is of type `C`.
    #[must_use]
    pub fn get<C: Component + 'static>(&self, id: ComponentId<C::Event>) -> Option<&C> {
        self.components
            .get(id.idx())
            .and_then(|c| c.as_any().downcast_ref::<C>())
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Answers whether no component is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub(crate) fn process_event_entry(
        &mut self,
        entry: EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let component = self
            .components
            .get_mut(entry.component_idx())
            .ok_or(SimError::MissingState("component"))?;
        component.process_event_entry(entry, scheduler, state)
    }
}
