use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use simcore::{
    ComponentId, Container, FilteredPriorityPool, Pool, PriorityResource, SimError, Simulation,
};

use crate::ship::{Durations, Resources};
use crate::{
    ArrivalsEvent, BargeId, BargeTender, FuelBarge, HarbourConfig, HarbourMonitor, QueueCategory,
    ScriptedArrival, Series, ShipArrivals, ShipEvent, ShipId, ShipProcess, ShipRecord,
    TugMaintenance, TugId, TugRegistry, WaitSummary,
};

type Ships = ShipProcess<ChaCha8Rng, HarbourMonitor>;

/// State of the harbour at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarbourSummary {
    /// Simulation time reached.
    pub time: f64,
    /// Ships arrived so far.
    pub ships_arrived: usize,
    /// Ships still in the harbour.
    pub ships_in_system: i64,
    /// Ships that left their dock.
    pub ships_supplied: i64,
    /// Tugs in maintenance.
    pub tugs_in_maintenance: i64,
    /// Entrance wait times, if any ship got in.
    pub entrance_wait: Option<WaitSummary>,
    /// Bunkering wait times, if any ship got a barge.
    pub bunkering_wait: Option<WaitSummary>,
    /// Exit wait times, if any ship got out.
    pub exit_wait: Option<WaitSummary>,
    /// Final fuel level of each barge.
    pub barge_levels: Vec<f64>,
}

/// Harbour simulation, ready to run.
///
/// # Examples
///
/// ```
/// # use harbour::{Harbour, HarbourConfig, Series};
/// let config = HarbourConfig { horizon: 24.0, ..HarbourConfig::default() };
/// let mut harbour = Harbour::new(&config)?;
/// harbour.run()?;
/// assert_eq!(harbour.time(), 24.0);
/// assert!(harbour.monitor()?.current(Series::ShipsSupplied) > 0);
/// # Ok::<(), eyre::Report>(())
/// ```
pub struct Harbour {
    sim: Simulation,
    horizon: f64,
    ships: ComponentId<ShipEvent>,
    resources: Resources<HarbourMonitor>,
    barges: Vec<FuelBarge>,
}

impl Harbour {
    /// Constructs a harbour with random arrivals.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &HarbourConfig) -> eyre::Result<Self> {
        Self::build(config, |rng, ships| {
            ShipArrivals::random(rng, config.arrival_rate, config.special_probability, ships)
        })
    }

    /// Constructs a harbour replaying the given `arrivals` instead of generating them.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or any arrival time is negative.
    pub fn scripted(config: &HarbourConfig, arrivals: Vec<ScriptedArrival>) -> eyre::Result<Self> {
        Self::build(config, |rng, ships| {
            ShipArrivals::scripted(rng, arrivals, ships)
        })
    }

    fn build<F>(config: &HarbourConfig, arrivals: F) -> eyre::Result<Self>
    where
        F: FnOnce(ChaCha8Rng, ComponentId<ShipEvent>) -> Result<ShipArrivals<ChaCha8Rng>, SimError>,
    {
        config.validate().wrap_err("invalid harbour configuration")?;
        let mut seeds = ChaCha8Rng::seed_from_u64(config.seed);
        let mut child_rng = || ChaCha8Rng::seed_from_u64(seeds.next_u64());
        let mut sim = Simulation::default();

        let docks = sim.state.insert(PriorityResource::new(config.docks));

        let mut tug_pool = FilteredPriorityPool::bounded(config.tugs);
        for tug in 0..config.tugs {
            tug_pool.put(TugId::from(tug), &mut sim.scheduler)?;
        }
        let tugs = sim.state.insert(tug_pool);
        let registry = sim.state.insert(TugRegistry::new(config.tugs));

        let mut barge_pool = Pool::bounded(config.barges);
        let mut barges = Vec::with_capacity(config.barges);
        for barge in 0..config.barges {
            let barge = FuelBarge {
                id: BargeId::from(barge),
                tank: sim.state.insert(Container::full(config.barge_capacity)?),
                threshold: config.barge_threshold(),
            };
            barge_pool.put(barge, &mut sim.scheduler)?;
            barges.push(barge);
        }
        let barge_pool = sim.state.insert(barge_pool);

        let monitor = sim
            .state
            .insert(HarbourMonitor::new(sim.scheduler.clock()));
        let resources = Resources {
            docks,
            tugs,
            barges: barge_pool,
            registry,
            monitor,
        };

        let tender = sim.add_component(BargeTender::new(
            child_rng(),
            config.barge_refuel_time.delay()?,
        ));
        let ships = sim.add_component(Ships::new(
            child_rng(),
            Durations {
                docking: config.docking_time.delay()?,
                cargo: config.cargo_time.delay()?,
                bunkering: config.bunkering_time.delay()?,
            },
            resources,
            tender,
        ));
        let arrivals = sim.add_component(arrivals(child_rng(), ships)?);
        sim.schedule(0.0, arrivals, ArrivalsEvent::Start)?;

        for tug in 0..config.tugs {
            let mut maintenance = TugMaintenance::new(
                TugId::from(tug),
                child_rng(),
                config.maintenance_interval.delay()?,
                config.maintenance_time_mean,
                tugs,
                registry,
                monitor,
            )?;
            let first = maintenance.next_interval();
            let maintenance = sim.add_component(maintenance);
            sim.schedule(first, maintenance, crate::MaintenanceEvent::Due)?;
        }

        log::debug!(
            "Harbour with {} docks, {} tugs, and {} barges, running until {}",
            config.docks,
            config.tugs,
            config.barges,
            config.horizon
        );

        Ok(Self {
            sim,
            horizon: config.horizon,
            ships,
            resources,
            barges,
        })
    }

    /// Runs until the horizon. Returns the final time.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while processing events.
    pub fn run(&mut self) -> eyre::Result<f64> {
        Ok(self.sim.run_until(self.horizon)?)
    }

    /// Same as [`Harbour::run`], but displays a progress bar advancing every simulated hour.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while processing events.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn run_with_progress(&mut self) -> eyre::Result<f64> {
        let hours = self.horizon.ceil() as u64;
        let pb = ProgressBar::new(hours)
            .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {percent}%"));
        for hour in 1..=hours {
            let time = self.sim.run_until((hour as f64).min(self.horizon))?;
            let monitor = self.monitor()?;
            pb.set_position(hour);
            pb.set_message(&format!(
                "[{time:.0}h] [S={in_system}] [W={waiting}] [D={docked}] [X={supplied}] [M={maintenance}]",
                time = time,
                in_system = monitor.current(Series::ShipsInSystem),
                waiting = monitor.current(Series::ShipsWaiting)
                    + monitor.current(Series::SpecialShipsWaiting),
                docked = monitor.current(Series::ShipsDocked),
                supplied = monitor.current(Series::ShipsSupplied),
                maintenance = monitor.current(Series::TugsInMaintenance),
            ));
        }
        pb.finish();
        // A zero horizon skips the loop entirely.
        Ok(self.sim.run_until(self.horizon)?)
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.sim.time()
    }

    /// Time at which [`Harbour::run`] stops.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// The monitor recording the harbour state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if the monitor is gone from the state.
    pub fn monitor(&self) -> Result<&HarbourMonitor, SimError> {
        self.sim.state.fetch(self.resources.monitor)
    }

    /// Status of all tugs.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if the registry is gone from the state.
    pub fn tug_registry(&self) -> Result<&TugRegistry, SimError> {
        self.sim.state.fetch(self.resources.registry)
    }

    /// Tugs currently available in the pool.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if the pool is gone from the state.
    pub fn idle_tugs(&self) -> Result<usize, SimError> {
        Ok(self.sim.state.fetch(self.resources.tugs)?.len())
    }

    /// Docks currently held by ships.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if the docks are gone from the state.
    pub fn docks_in_use(&self) -> Result<usize, SimError> {
        Ok(self.sim.state.fetch(self.resources.docks)?.in_use())
    }

    /// Current fuel level of each barge, by barge ID.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if a tank is gone from the state.
    pub fn barge_levels(&self) -> Result<Vec<f64>, SimError> {
        self.barges
            .iter()
            .map(|barge| self.sim.state.fetch(barge.tank).map(Container::level))
            .collect()
    }

    fn ship_process(&self) -> Result<&Ships, SimError> {
        self.sim
            .component::<Ships>(self.ships)
            .ok_or(SimError::MissingState("ship process"))
    }

    /// Record of the ship `id`, if it has arrived.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&ShipRecord> {
        self.ship_process().ok()?.ship(id)
    }

    /// Records of all arrived ships, sorted by ID.
    #[must_use]
    pub fn ships(&self) -> Vec<&ShipRecord> {
        let mut ships: Vec<_> = self
            .ship_process()
            .map(|process| process.ships().collect())
            .unwrap_or_default();
        ships.sort_by_key(|record| record.ship().id);
        ships
    }

    /// Summarizes the current state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] if part of the harbour is gone from the state.
    pub fn summary(&self) -> Result<HarbourSummary, SimError> {
        let monitor = self.monitor()?;
        Ok(HarbourSummary {
            time: self.time(),
            ships_arrived: self.ship_process()?.ships().count(),
            ships_in_system: monitor.current(Series::ShipsInSystem),
            ships_supplied: monitor.current(Series::ShipsSupplied),
            tugs_in_maintenance: monitor.current(Series::TugsInMaintenance),
            entrance_wait: monitor.summary(QueueCategory::Entrance).ok(),
            bunkering_wait: monitor.summary(QueueCategory::Bunkering).ok(),
            exit_wait: monitor.summary(QueueCategory::Exit).ok(),
            barge_levels: self.barge_levels()?,
        })
    }
}
