use itertools::Itertools;
use serde::Serialize;
use simcore::{ClockRef, SimError};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::NORMAL_PRIORITY;

/// Queues in which ships wait for resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueCategory {
    /// Waiting for a dock and a tug to get in.
    Entrance,
    /// Waiting for a fuel barge.
    Bunkering,
    /// Waiting for a tug to get out.
    Exit,
}

/// Time series tracked by the [`HarbourMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Series {
    /// Ships that arrived and have not exited yet.
    ShipsInSystem,
    /// Normal ships waiting to get in.
    ShipsWaiting,
    /// Special ships waiting to get in.
    SpecialShipsWaiting,
    /// Tugs towing a ship.
    TugsInUse,
    /// Docks occupied by docked ships.
    DocksInUse,
    /// Ships that finished their service.
    ShipsSupplied,
    /// Tugs in maintenance.
    TugsInMaintenance,
    /// Ships at a dock.
    ShipsDocked,
    /// Docked ships waiting for a barge.
    ShipsWaitingBunkering,
    /// Ships being bunkered.
    ShipsBunkering,
    /// Barges bunkering a ship.
    BargesInUse,
}

/// Receives notifications about the transitions of the harbour model as they happen.
pub trait Recorder {
    /// A ship with the given priority has arrived.
    fn ship_arrived(&mut self, priority: i32);
    /// A ship with the given priority got a dock and a tug, and is being towed in.
    fn docking_started(&mut self, priority: i32);
    /// A ship is at its dock.
    fn docking_completed(&mut self);
    /// A ship got a barge.
    fn bunkering_started(&mut self);
    /// A ship is full, and its barge is released.
    fn bunkering_completed(&mut self);
    /// A tug went into maintenance.
    fn maintenance_started(&mut self);
    /// A tug is back from maintenance.
    fn maintenance_completed(&mut self);
    /// A tug was taken to tow a ship out.
    fn tug_locked(&mut self);
    /// A tug finished towing a ship out.
    fn tug_released(&mut self);
    /// A ship left its dock.
    fn ship_supplied(&mut self);
    /// A ship left the harbour.
    fn ship_exited(&mut self);
    /// A ship waited `wait` hours to get in.
    fn entrance_wait(&mut self, wait: f64);
    /// A ship waited `wait` hours for a barge.
    fn bunkering_wait(&mut self, wait: f64);
    /// A ship waited `wait` hours to get out.
    fn exit_wait(&mut self, wait: f64);
}

/// Minimum, maximum, and mean of the wait times recorded for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaitSummary {
    /// Number of samples.
    pub count: usize,
    /// Shortest wait.
    pub min: f64,
    /// Longest wait.
    pub max: f64,
    /// Average wait.
    pub mean: f64,
}

#[derive(Debug, Default)]
struct Counter {
    value: i64,
    points: Vec<(f64, i64)>,
}

/// Records the state of the harbour over time.
///
/// Each [`Series`] starts with a single `(0, 0)` point, and gets a new point with the current
/// time every time it changes.
#[derive(Debug)]
pub struct HarbourMonitor {
    clock: ClockRef,
    counters: Vec<Counter>,
    waits: [Vec<f64>; 3],
}

impl HarbourMonitor {
    /// Constructs a monitor reading the time from `clock`.
    #[must_use]
    pub fn new(clock: ClockRef) -> Self {
        let start = clock.time();
        let counters = Series::iter()
            .map(|_| Counter {
                value: 0,
                points: vec![(start, 0)],
            })
            .collect();
        Self {
            clock,
            counters,
            waits: Default::default(),
        }
    }

    fn bump(&mut self, series: Series, delta: i64) {
        let time = self.clock.time();
        let counter = &mut self.counters[series as usize];
        counter.value += delta;
        counter.points.push((time, counter.value));
    }

    fn waiting_series(priority: i32) -> Series {
        if priority == NORMAL_PRIORITY {
            Series::ShipsWaiting
        } else {
            Series::SpecialShipsWaiting
        }
    }

    /// Current value of `series`.
    #[must_use]
    pub fn current(&self, series: Series) -> i64 {
        self.counters[series as usize].value
    }

    /// All recorded `(time, value)` points of `series`.
    #[must_use]
    pub fn series(&self, series: Series) -> &[(f64, i64)] {
        &self.counters[series as usize].points
    }

    /// All recorded wait times of `category`, in the order they were recorded.
    #[must_use]
    pub fn waits(&self, category: QueueCategory) -> &[f64] {
        &self.waits[category as usize]
    }

    /// Summarizes the wait times of `category`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptySampleSet`] if no ship has waited in this queue yet.
    pub fn summary(&self, category: QueueCategory) -> Result<WaitSummary, SimError> {
        let waits = self.waits(category);
        match waits.iter().copied().minmax().into_option() {
            Some((min, max)) => Ok(WaitSummary {
                count: waits.len(),
                min,
                max,
                mean: waits.iter().sum::<f64>() / waits.len() as f64,
            }),
            None => Err(SimError::EmptySampleSet(category.to_string())),
        }
    }

    /// Logs the summary of each queue to the queues stream.
    pub fn log_summaries(&self) {
        for category in QueueCategory::iter() {
            match self.summary(category) {
                Ok(summary) => log::info!(
                    target: crate::targets::QUEUES,
                    "[{}_WAIT]: Min.: {}, Max.: {}, Avg.: {}",
                    category,
                    summary.min,
                    summary.max,
                    summary.mean
                ),
                Err(err) => log::info!(
                    target: crate::targets::QUEUES,
                    "[{}_WAIT]: {}",
                    category,
                    err
                ),
            }
        }
    }
}

impl Recorder for HarbourMonitor {
    fn ship_arrived(&mut self, priority: i32) {
        self.bump(Series::ShipsInSystem, 1);
        self.bump(Self::waiting_series(priority), 1);
    }

    fn docking_started(&mut self, priority: i32) {
        self.bump(Self::waiting_series(priority), -1);
        self.bump(Series::TugsInUse, 1);
    }

    fn docking_completed(&mut self) {
        self.bump(Series::TugsInUse, -1);
        self.bump(Series::DocksInUse, 1);
        self.bump(Series::ShipsDocked, 1);
        self.bump(Series::ShipsWaitingBunkering, 1);
    }

    fn bunkering_started(&mut self) {
        self.bump(Series::ShipsWaitingBunkering, -1);
        self.bump(Series::ShipsBunkering, 1);
        self.bump(Series::BargesInUse, 1);
    }

    fn bunkering_completed(&mut self) {
        self.bump(Series::ShipsBunkering, -1);
        self.bump(Series::BargesInUse, -1);
    }

    fn maintenance_started(&mut self) {
        self.bump(Series::TugsInMaintenance, 1);
    }

    fn maintenance_completed(&mut self) {
        self.bump(Series::TugsInMaintenance, -1);
    }

    fn tug_locked(&mut self) {
        self.bump(Series::TugsInUse, 1);
    }

    fn tug_released(&mut self) {
        self.bump(Series::TugsInUse, -1);
    }

    fn ship_supplied(&mut self) {
        self.bump(Series::DocksInUse, -1);
        self.bump(Series::ShipsDocked, -1);
        self.bump(Series::ShipsSupplied, 1);
    }

    fn ship_exited(&mut self) {
        self.bump(Series::ShipsInSystem, -1);
    }

    fn entrance_wait(&mut self, wait: f64) {
        self.waits[QueueCategory::Entrance as usize].push(wait);
    }

    fn bunkering_wait(&mut self, wait: f64) {
        self.waits[QueueCategory::Bunkering as usize].push(wait);
    }

    fn exit_wait(&mut self, wait: f64) {
        self.waits[QueueCategory::Exit as usize].push(wait);
    }
}
