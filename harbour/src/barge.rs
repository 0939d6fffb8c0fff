use rand::Rng;
use rand_distr::Distribution;
use simcore::{Component, ComponentId, Container, Key, Resume, Scheduler, SimError, State};

use crate::{targets, BargeId, Delay};

/// A fuel barge. The tank itself lives in the simulation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelBarge {
    /// Barge ID.
    pub id: BargeId,
    /// Fuel tank.
    pub tank: Key<Container>,
    /// The barge refills once its tank level falls below this.
    pub threshold: f64,
}

impl FuelBarge {
    /// Checks the tank level, and asks `tender` to refill it if it fell below the threshold.
    /// Returns `true` if a refill was requested, in which case `done` fires once it is over.
    /// Otherwise, nothing happens.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if the tank is not in the state.
    pub fn check_tank(
        &self,
        tender: ComponentId<Event>,
        done: Resume<()>,
        scheduler: &mut Scheduler,
        state: &State,
    ) -> Result<bool, SimError> {
        if state.fetch(self.tank)?.level() < self.threshold {
            scheduler.schedule_immediately(
                tender,
                Event::Refuel {
                    barge: *self,
                    done,
                },
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// One round of bunkering a ship from a barge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transfer {
    /// The barge is full but still cannot fill the ship: the whole tank goes to the ship, and
    /// then the barge refills.
    WholeTank(f64),
    /// The barge has enough: the ship gets exactly what it misses.
    Missing(f64),
    /// The barge is neither full nor has enough: the rest of the tank goes to the ship right away,
    /// and then the barge refills.
    Remainder(f64),
}

impl Transfer {
    /// Amount taken from the barge.
    #[must_use]
    pub fn amount(self) -> f64 {
        match self {
            Self::WholeTank(amount) | Self::Missing(amount) | Self::Remainder(amount) => amount,
        }
    }
}

/// Decides the next bunkering round for a ship missing `missing` liters, from a tank at
/// `level` out of `capacity`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn next_transfer(missing: f64, level: f64, capacity: f64) -> Transfer {
    if level == capacity && level < missing {
        Transfer::WholeTank(capacity)
    } else if level >= missing {
        Transfer::Missing(missing)
    } else {
        Transfer::Remainder(level)
    }
}

/// Barge tender events.
#[derive(Debug)]
pub enum Event {
    /// Barge needs its tank refilled. `done` fires once the tank is full again.
    Refuel {
        /// The barge to refill.
        barge: FuelBarge,
        /// Continuation of whoever waits for the refill.
        done: Resume<()>,
    },
    /// Refill is over.
    Refilled {
        /// The refilled barge.
        barge: FuelBarge,
        /// Continuation of whoever waits for the refill.
        done: Resume<()>,
    },
}

/// Refills barge tanks. Each refill takes a random time, after which the tank is topped up to
/// its capacity at once.
pub struct BargeTender<R: Rng> {
    rng: R,
    refuel_time: Delay,
}

impl<R: Rng> BargeTender<R> {
    /// Constructs a tender drawing refill durations from `refuel_time`.
    pub fn new(rng: R, refuel_time: Delay) -> Self {
        Self { rng, refuel_time }
    }
}

impl<R: Rng + 'static> Component for BargeTender<R> {
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Event>,
        event: Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        match event {
            Event::Refuel { barge, done } => {
                log::info!(
                    target: targets::DOCK,
                    "[{:.3}]: FuelBarge {} refuels at tank level {:.0}.",
                    scheduler.time(),
                    barge.id,
                    state.fetch(barge.tank)?.level()
                );
                let delay = self.refuel_time.sample(&mut self.rng);
                scheduler.schedule(delay, self_id, Event::Refilled { barge, done })?;
            }
            Event::Refilled { barge, done } => {
                state.fetch_mut(barge.tank)?.fill(scheduler);
                log::info!(
                    target: targets::DOCK,
                    "[{:.3}]: FuelBarge {} refueled!",
                    scheduler.time(),
                    barge.id
                );
                done.resume((), scheduler);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::TimeDistribution;
    use quickcheck_macros::quickcheck;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;
    use simcore::Simulation;

    #[rstest(
        missing,
        level,
        expected,
        case(150_000.0, 100_000.0, Transfer::WholeTank(100_000.0)),
        case(100_000.0, 100_000.0, Transfer::Missing(100_000.0)),
        case(40_000.0, 60_000.0, Transfer::Missing(40_000.0)),
        case(90_000.0, 60_000.0, Transfer::Remainder(60_000.0)),
        case(90_000.0, 0.0, Transfer::Remainder(0.0))
    )]
    fn test_next_transfer(missing: f64, level: f64, expected: Transfer) {
        assert_eq!(next_transfer(missing, level, 100_000.0), expected);
    }

    /// Plays the bunkering rounds with instant refills. Returns the number of rounds and the
    /// final ship level.
    fn bunker(capacity: u32, level: u32, tank: u32, tank_capacity: u32) -> (usize, f64) {
        let capacity = f64::from(capacity);
        let mut level = f64::from(level);
        let tank_capacity = f64::from(tank_capacity);
        let mut tank = f64::from(tank).min(tank_capacity);
        let mut rounds = 0;
        loop {
            rounds += 1;
            let transfer = next_transfer(capacity - level, tank, tank_capacity);
            level += transfer.amount();
            if let Transfer::Missing(_) = transfer {
                return (rounds, level);
            }
            tank = tank_capacity;
        }
    }

    #[quickcheck]
    fn test_bunkering_terminates_with_full_ship(
        capacity: u32,
        level: u32,
        tank: u32,
        tank_capacity: u16,
    ) -> bool {
        let capacity = capacity % 1_000_000 + 1;
        let level = level % capacity;
        let tank_capacity = u32::from(tank_capacity) + 1;
        let missing = capacity - level;
        // At most one partial round, then full tanks until the last one.
        let bound = (missing + tank_capacity - 1) / tank_capacity + 1;
        let (rounds, final_level) = bunker(capacity, level, tank, tank_capacity);
        #[allow(clippy::float_cmp)]
        let full = final_level == f64::from(capacity);
        full && rounds <= bound as usize
    }

    fn tender_sim(level: f64) -> (Simulation, ComponentId<Event>, FuelBarge) {
        let mut sim = Simulation::default();
        let tender = sim.add_component(BargeTender::new(
            ChaCha8Rng::seed_from_u64(0),
            TimeDistribution::fixed(1.0).delay().unwrap(),
        ));
        let barge = FuelBarge {
            id: BargeId::from(0),
            tank: sim.state.insert(Container::new(100_000.0, level).unwrap()),
            threshold: 20_000.0,
        };
        (sim, tender, barge)
    }

    #[test]
    fn test_check_above_threshold_is_noop() {
        let (mut sim, tender, barge) = tender_sim(20_000.0);
        let (probe, trace) = testing::probe::<()>(&mut sim);
        let triggered = barge
            .check_tank(tender, Resume::new(probe, |()| ()), &mut sim.scheduler, &sim.state)
            .unwrap();
        assert!(!triggered);
        assert!(sim.scheduler.is_empty());
        sim.run().unwrap();
        assert!(trace.borrow().is_empty());
        assert_eq!(sim.state.get(barge.tank).unwrap().level(), 20_000.0);
    }

    #[test]
    fn test_check_below_threshold_refills() {
        let (mut sim, tender, barge) = tender_sim(19_999.0);
        let (probe, trace) = testing::probe::<()>(&mut sim);
        let triggered = barge
            .check_tank(tender, Resume::new(probe, |()| ()), &mut sim.scheduler, &sim.state)
            .unwrap();
        assert!(triggered);
        sim.run().unwrap();
        assert_eq!(*trace.borrow(), vec![(1.0, ())]);
        assert!(sim.state.get(barge.tank).unwrap().is_full());
    }
    #[test]
    fn test_refill_from_fractional_level_is_full() {
        let (mut sim, tender, barge) = tender_sim(19_999.7 + 0.1);
        let done = Resume::from_fn(|(), _: &mut Scheduler| ());
        assert!(barge
            .check_tank(tender, done, &mut sim.scheduler, &sim.state)
            .unwrap());
        sim.run().unwrap();
        let tank = sim.state.get(barge.tank).unwrap();
        assert!(tank.is_full());
        assert_eq!(tank.level(), 100_000.0);
    }
}
