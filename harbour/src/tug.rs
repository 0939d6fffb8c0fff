use rand::Rng;
use rand_distr::{Distribution, Exp};
use simcore::{
    Component, ComponentId, FilteredPriorityPool, Key, Resume, Scheduler, Selector, SimError,
    State,
};

use crate::{targets, Delay, Recorder, TugId, MAINTENANCE_PRIORITY};

#[derive(Debug, Default)]
struct TugStatus {
    working: bool,
    in_maintenance: bool,
}

/// Shared status of all tugs. A tug is *working* while it tows a ship.
#[derive(Debug)]
pub struct TugRegistry {
    tugs: Vec<TugStatus>,
}

impl TugRegistry {
    /// Constructs a registry of `count` idle tugs.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            tugs: (0..count).map(|_| TugStatus::default()).collect(),
        }
    }

    fn status(&self, tug: TugId) -> Result<&TugStatus, SimError> {
        self.tugs
            .get(usize::from(tug))
            .ok_or(SimError::MissingState("tug status"))
    }

    fn status_mut(&mut self, tug: TugId) -> Result<&mut TugStatus, SimError> {
        self.tugs
            .get_mut(usize::from(tug))
            .ok_or(SimError::MissingState("tug status"))
    }

    /// Answers whether `tug` is towing a ship.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] for an unknown tug.
    pub fn is_working(&self, tug: TugId) -> Result<bool, SimError> {
        Ok(self.status(tug)?.working)
    }

    /// Answers whether `tug` is in maintenance.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] for an unknown tug.
    pub fn in_maintenance(&self, tug: TugId) -> Result<bool, SimError> {
        Ok(self.status(tug)?.in_maintenance)
    }

    /// Number of tugs towing a ship.
    #[must_use]
    pub fn working_count(&self) -> usize {
        self.tugs.iter().filter(|t| t.working).count()
    }

    /// Marks `tug` as towing a ship.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] for an unknown tug.
    pub fn start_transport(&mut self, tug: TugId) -> Result<(), SimError> {
        self.status_mut(tug)?.working = true;
        Ok(())
    }

    /// Marks the transport of `tug` as finished.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] for an unknown tug.
    pub fn finish_transport(&mut self, tug: TugId) -> Result<(), SimError> {
        self.status_mut(tug)?.working = false;
        Ok(())
    }

    fn set_maintenance(&mut self, tug: TugId, in_maintenance: bool) -> Result<(), SimError> {
        let status = self.status_mut(tug)?;
        status.working = false;
        status.in_maintenance = in_maintenance;
        Ok(())
    }
}

/// Tug maintenance events.
#[derive(Debug)]
pub enum Event {
    /// Time for the next maintenance.
    Due,
    /// The tug was taken out of the pool.
    Acquired(TugId),
    /// Maintenance is over.
    Finished(TugId),
}

/// The maintenance loop of a single tug.
///
/// Once the maintenance is due, the tug requests itself from the tug pool with
/// [`MAINTENANCE_PRIORITY`]. A tug towing a ship finishes the transport first, and the request
/// is granted the moment the tug is put back, ahead of any ship waiting for a tug. It is back
/// in the pool after an exponentially distributed time.
pub struct TugMaintenance<R: Rng, M> {
    tug: TugId,
    rng: R,
    interval: Delay,
    duration: Exp<f64>,
    pool: Key<FilteredPriorityPool<TugId>>,
    registry: Key<TugRegistry>,
    monitor: Key<M>,
}

impl<R: Rng, M: Recorder> TugMaintenance<R, M> {
    /// Constructs the maintenance loop of `tug`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDistribution`] if `duration_mean` is not positive.
    pub fn new(
        tug: TugId,
        rng: R,
        interval: Delay,
        duration_mean: f64,
        pool: Key<FilteredPriorityPool<TugId>>,
        registry: Key<TugRegistry>,
        monitor: Key<M>,
    ) -> Result<Self, SimError> {
        let duration = Exp::new(1.0 / duration_mean).map_err(|err| {
            SimError::InvalidDistribution(format!("maintenance mean {}: {}", duration_mean, err))
        })?;
        Ok(Self {
            tug,
            rng,
            interval,
            duration,
            pool,
            registry,
            monitor,
        })
    }

    /// Draws the time until the next maintenance.
    pub fn next_interval(&mut self) -> f64 {
        self.interval.sample(&mut self.rng)
    }
}

impl<R, M> Component for TugMaintenance<R, M>
where
    R: Rng + 'static,
    M: Recorder + 'static,
{
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Event>,
        event: Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        match event {
            Event::Due => {
                if state.fetch(self.registry)?.is_working(self.tug)? {
                    log::info!(
                        target: targets::ARRIVALS,
                        "[{:.3}]: Tug {} scheduled for maintenance!",
                        scheduler.time(),
                        self.tug
                    );
                }
                state.fetch_mut(self.pool)?.get(
                    MAINTENANCE_PRIORITY,
                    Selector::Id(self.tug),
                    Resume::new(self_id, Event::Acquired),
                    scheduler,
                );
            }
            Event::Acquired(tug) => {
                state.fetch_mut(self.registry)?.set_maintenance(tug, true)?;
                state.fetch_mut(self.monitor)?.maintenance_started();
                log::info!(
                    target: targets::ARRIVALS,
                    "[{:.3}]: Tug {} in maintenance!",
                    scheduler.time(),
                    tug
                );
                let duration = self.duration.sample(&mut self.rng);
                scheduler.schedule(duration, self_id, Event::Finished(tug))?;
            }
            Event::Finished(tug) => {
                state.fetch_mut(self.pool)?.put(tug, scheduler)?;
                state.fetch_mut(self.monitor)?.maintenance_completed();
                state.fetch_mut(self.registry)?.set_maintenance(tug, false)?;
                log::info!(
                    target: targets::ARRIVALS,
                    "[{:.3}]: Tug {} finished maintenance!",
                    scheduler.time(),
                    tug
                );
                let interval = self.next_interval();
                scheduler.schedule(interval, self_id, Event::Due)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{HarbourMonitor, Series, TimeDistribution};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use simcore::Simulation;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Grants = Rc<RefCell<Vec<(f64, TugId)>>>;

    struct Setup {
        sim: Simulation,
        pool: Key<FilteredPriorityPool<TugId>>,
        registry: Key<TugRegistry>,
        monitor: Key<HarbourMonitor>,
        maintenance: ComponentId<Event>,
    }

    fn setup() -> Setup {
        let mut sim = Simulation::default();
        let mut tugs = FilteredPriorityPool::bounded(2);
        tugs.put(TugId::from(0), &mut sim.scheduler).unwrap();
        tugs.put(TugId::from(1), &mut sim.scheduler).unwrap();
        let pool = sim.state.insert(tugs);
        let registry = sim.state.insert(TugRegistry::new(2));
        let monitor = sim
            .state
            .insert(HarbourMonitor::new(sim.scheduler.clock()));
        let maintenance = TugMaintenance::new(
            TugId::from(1),
            ChaCha8Rng::seed_from_u64(7),
            TimeDistribution::fixed(24.0).delay().unwrap(),
            5.0,
            pool,
            registry,
            monitor,
        )
        .unwrap();
        let maintenance = sim.add_component(maintenance);
        Setup {
            sim,
            pool,
            registry,
            monitor,
            maintenance,
        }
    }

    #[test]
    fn test_idle_tug_goes_to_maintenance() {
        let Setup {
            mut sim,
            pool,
            registry,
            monitor,
            maintenance,
        } = setup();
        sim.schedule(24.0, maintenance, Event::Due).unwrap();
        sim.run_until(24.0 + 1e-9).unwrap();
        let tugs = sim.state.get(pool).unwrap();
        assert!(tugs.contains(TugId::from(0)));
        assert!(!tugs.contains(TugId::from(1)));
        assert!(sim.state.get(registry).unwrap().in_maintenance(TugId::from(1)).unwrap());
        let monitor = sim.state.get(monitor).unwrap();
        assert_eq!(monitor.series(Series::TugsInMaintenance)[1], (24.0, 1));
    }

    fn request(
        sim: &mut Simulation,
        pool: Key<FilteredPriorityPool<TugId>>,
        grants: &Grants,
        selector: Selector<TugId>,
    ) {
        let grants = Rc::clone(grants);
        sim.state.get_mut(pool).unwrap().get(
            crate::NORMAL_PRIORITY,
            selector,
            Resume::from_fn(move |tug, scheduler: &mut Scheduler| {
                grants.borrow_mut().push((scheduler.time(), tug));
            }),
            &mut sim.scheduler,
        );
    }

    #[test]
    fn test_working_tug_finishes_transport_first() {
        let Setup {
            mut sim,
            pool,
            registry,
            monitor,
            maintenance,
        } = setup();
        let grants = Grants::default();
        request(&mut sim, pool, &grants, Selector::Id(TugId::from(1)));
        request(&mut sim, pool, &grants, Selector::Id(TugId::from(0)));
        sim.state
            .get_mut(registry)
            .unwrap()
            .start_transport(TugId::from(1))
            .unwrap();
        // Queued before the maintenance is due.
        request(&mut sim, pool, &grants, Selector::Any);
        sim.schedule(0.5, maintenance, Event::Due).unwrap();
        sim.run_until(1.0).unwrap();
        assert_eq!(
            *grants.borrow(),
            vec![(0.0, TugId::from(1)), (0.0, TugId::from(0))]
        );
        assert_eq!(sim.state.get(monitor).unwrap().current(Series::TugsInMaintenance), 0);
        assert_eq!(sim.state.get(pool).unwrap().queue_len(), 2);

        sim.state
            .get_mut(pool)
            .unwrap()
            .put(TugId::from(1), &mut sim.scheduler)
            .unwrap();
        sim.state
            .get_mut(registry)
            .unwrap()
            .finish_transport(TugId::from(1))
            .unwrap();
        sim.run_until(1.0 + 1e-9).unwrap();
        assert_eq!(grants.borrow().len(), 2);
        assert_eq!(sim.state.get(monitor).unwrap().current(Series::TugsInMaintenance), 1);
        assert!(sim.state.get(registry).unwrap().in_maintenance(TugId::from(1)).unwrap());
        let tugs = sim.state.get(pool).unwrap();
        assert!(!tugs.contains(TugId::from(1)));
        assert_eq!(tugs.queue_len(), 1);
    }

    #[test]
    fn test_back_in_pool_after_maintenance() {
        let Setup {
            mut sim,
            pool,
            monitor,
            maintenance,
            ..
        } = setup();
        sim.schedule(0.0, maintenance, Event::Due).unwrap();
        sim.run_until(10_000.0).unwrap();
        let monitor = sim.state.get(monitor).unwrap();
        let points = monitor.series(Series::TugsInMaintenance);
        assert!(points.len() > 3);
        for pair in points[1..].windows(2) {
            assert_ne!(pair[0].1, pair[1].1);
        }
        let in_maintenance = monitor.current(Series::TugsInMaintenance) == 1;
        let tugs = sim.state.get(pool).unwrap();
        assert_eq!(tugs.contains(TugId::from(1)), !in_maintenance);
    }
}
