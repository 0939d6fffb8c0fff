use std::collections::VecDeque;

use rand::Rng;
use rand_distr::{Distribution, Exp};
use simcore::{Component, ComponentId, Scheduler, SimError, State};

use crate::ship::{self, Ship};
use crate::{ScriptedArrival, ShipId, NORMAL_PRIORITY, SPECIAL_PRIORITY};

#[derive(Debug)]
enum Source {
    Random {
        interarrival: Exp<f64>,
        special_probability: f64,
    },
    Scripted(VecDeque<ScriptedArrival>),
}

/// Arrival generator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Schedules the first arrival.
    Start,
    /// The next ship arrives.
    Arrival,
}

/// Generates ships and hands them over to the ship process.
///
/// Random arrivals come after exponentially distributed gaps, and each ship is special with a
/// fixed probability. Scripted arrivals follow a predefined list, and the generator stops once
/// it is exhausted.
pub struct ShipArrivals<R: Rng> {
    rng: R,
    source: Source,
    ships: ComponentId<ship::Event>,
    next_id: usize,
    pending: Option<Ship>,
}

impl<R: Rng> ShipArrivals<R> {
    /// Generates ships at `rate` arrivals per hour.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDistribution`] if the rate is not positive, or the
    /// probability does not lie in `[0, 1]`.
    pub fn random(
        rng: R,
        rate: f64,
        special_probability: f64,
        ships: ComponentId<ship::Event>,
    ) -> Result<Self, SimError> {
        let interarrival = Exp::new(rate)
            .ok()
            .filter(|_| rate > 0.0)
            .ok_or_else(|| SimError::InvalidDistribution(format!("arrival rate {}", rate)))?;
        if !(0.0..=1.0).contains(&special_probability) {
            return Err(SimError::InvalidDistribution(format!(
                "special ship probability {}",
                special_probability
            )));
        }
        Ok(Self::with_source(
            rng,
            Source::Random {
                interarrival,
                special_probability,
            },
            ships,
        ))
    }

    /// Replays `arrivals` in the order of their times.
    /// Fuel that is not given in the script is drawn at random.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDelay`] for a negative or non-finite arrival time.
    pub fn scripted(
        rng: R,
        mut arrivals: Vec<ScriptedArrival>,
        ships: ComponentId<ship::Event>,
    ) -> Result<Self, SimError> {
        if let Some(arrival) = arrivals
            .iter()
            .find(|a| !a.time.is_finite() || a.time < 0.0)
        {
            return Err(SimError::InvalidDelay(arrival.time));
        }
        arrivals.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self::with_source(
            rng,
            Source::Scripted(arrivals.into()),
            ships,
        ))
    }

    fn with_source(rng: R, source: Source, ships: ComponentId<ship::Event>) -> Self {
        Self {
            rng,
            source,
            ships,
            next_id: 0,
            pending: None,
        }
    }

    /// Prepares the next ship and returns the time until its arrival,
    /// or `None` if no more ships come.
    fn prepare(&mut self, now: f64) -> Option<f64> {
        let id = ShipId::from(self.next_id);
        let (ship, delay) = match &mut self.source {
            Source::Random {
                interarrival,
                special_probability,
            } => {
                let delay = interarrival.sample(&mut self.rng);
                let priority = if self.rng.gen_bool(*special_probability) {
                    SPECIAL_PRIORITY
                } else {
                    NORMAL_PRIORITY
                };
                (Ship::random(id, priority, &mut self.rng), delay)
            }
            Source::Scripted(arrivals) => {
                let arrival = arrivals.pop_front()?;
                let mut ship = Ship::random(id, arrival.priority, &mut self.rng);
                if let Some(capacity) = arrival.fuel_capacity {
                    ship.fuel_capacity = capacity;
                    ship.fuel_level = ship.fuel_level.min(capacity);
                }
                if let Some(level) = arrival.fuel_level {
                    ship.fuel_level = level.min(ship.fuel_capacity);
                }
                (ship, (arrival.time - now).max(0.0))
            }
        };
        self.next_id += 1;
        self.pending = Some(ship);
        Some(delay)
    }

    fn schedule_next(
        &mut self,
        self_id: ComponentId<Event>,
        scheduler: &mut Scheduler,
    ) -> Result<(), SimError> {
        if let Some(delay) = self.prepare(scheduler.time()) {
            scheduler.schedule(delay, self_id, Event::Arrival)?;
        }
        Ok(())
    }
}

impl<R: Rng + 'static> Component for ShipArrivals<R> {
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Event>,
        event: Event,
        scheduler: &mut Scheduler,
        _state: &mut State,
    ) -> Result<(), SimError> {
        match event {
            Event::Start => self.schedule_next(self_id, scheduler),
            Event::Arrival => {
                let ship = self
                    .pending
                    .take()
                    .ok_or(SimError::MissingState("pending ship"))?;
                scheduler.schedule_immediately(self.ships, ship::Event::Arrived(ship));
                self.schedule_next(self_id, scheduler)
            }
        }
    }
}
