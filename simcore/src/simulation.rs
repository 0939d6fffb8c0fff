use std::fmt;

use crate::{Component, ComponentId, Components, Scheduler, SimError, State};

/// Owns the components, the shared state, and the scheduler, and drives the event loop.
///
/// ```
/// # use simcore::{Component, ComponentId, Scheduler, SimError, Simulation, State};
/// struct Ticker(usize);
///
/// impl Component for Ticker {
///     type Event = ();
///     fn process_event(
///         &mut self,
///         self_id: ComponentId<()>,
///         _: (),
///         scheduler: &mut Scheduler,
///         _: &mut State,
///     ) -> Result<(), SimError> {
///         self.0 += 1;
///         scheduler.schedule(1.0, self_id, ())?;
///         Ok(())
///     }
/// }
///
/// let mut sim = Simulation::default();
/// let ticker = sim.add_component(Ticker(0));
/// sim.schedule(0.0, ticker, ()).unwrap();
/// assert_eq!(sim.run_until(2.5).unwrap(), 2.5);
/// assert_eq!(sim.component::<Ticker>(ticker).unwrap().0, 3);
/// ```
#[derive(Default)]
pub struct Simulation {
    /// Values shared between components.
    pub state: State,
    /// Event queue and clock.
    pub scheduler: Scheduler,
    components: Components,
}

impl Simulation {
    /// Adds a new component.
    #[must_use]
    pub fn add_component<E, C>(&mut self, component: C) -> ComponentId<E>
    where
        E: fmt::Debug + 'static,
        C: Component<Event = E> + 'static,
    {
        self.components.add_component(component)
    }

    /// Returns the component registered under `id`, if it is of type `C`.
    #[must_use]
    pub fn component<C: Component + 'static>(&self, id: ComponentId<C::Event>) -> Option<&C> {
        self.components.get::<C>(id)
    }

    /// Schedules a new event to be executed `delay` hours from now in component `component`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDelay`] if `delay` is negative or not finite.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: f64,
        component: ComponentId<E>,
        event: E,
    ) -> Result<(), SimError> {
        self.scheduler.schedule(delay, component, event).map(|_| ())
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.scheduler.time()
    }

    /// Performs one step of the simulation. Returns `true` if there was in fact an event
    /// available to process, and `false` instead, which signifies that the simulation ended.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the component processing the event.
    pub fn step(&mut self) -> Result<bool, SimError> {
        match self.scheduler.pop() {
            Some(entry) => {
                log::trace!("[{:.4}] [event] {:?}", entry.time(), entry.id());
                self.components
                    .process_event_entry(entry, &mut self.scheduler, &mut self.state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs until there are no more events in the queue.
    ///
    /// # Errors
    ///
    /// Stops at the first error returned by a component.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.step()? {}
        Ok(())
    }

    /// Runs all events scheduled before `horizon`, and then sets the clock to `horizon`.
    /// Events at or after the horizon stay in the queue. Returns the final time.
    ///
    /// # Errors
    ///
    /// Stops at the first error returned by a component.
    pub fn run_until(&mut self, horizon: f64) -> Result<f64, SimError> {
        self.run_until_with(horizon, |_| {})
    }

    /// Same as [`Simulation::run_until`], but calls `on_step` with the current time after each
    /// processed event, e.g., to report progress.
    ///
    /// # Errors
    ///
    /// Stops at the first error returned by a component.
    pub fn run_until_with<F>(&mut self, horizon: f64, mut on_step: F) -> Result<f64, SimError>
    where
        F: FnMut(f64),
    {
        while self
            .scheduler
            .peek_time()
            .map_or(false, |time| time < horizon)
        {
            self.step()?;
            on_step(self.scheduler.time());
        }
        self.scheduler.advance_to(horizon);
        Ok(self.scheduler.time())
    }
}
