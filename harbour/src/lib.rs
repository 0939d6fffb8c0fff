//! Harbour ship-servicing simulation.
//!
//! Ships arrive at the harbour, wait for a dock and a tug to bring them in, unload their cargo
//! while a fuel barge tops up their tanks, and then wait for a tug again to leave. Tugs
//! periodically go into maintenance, and barges refill their own tanks when they run low.
//!
//! # Constructing Simulation
//!
//! A simulation is constructed from a [`HarbourConfig`], either with randomly generated
//! arrivals ([`Harbour::new`]) or with a fixed script of arrivals ([`Harbour::scripted`]).
//! Everything it observes goes to a [`HarbourMonitor`].

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use simcore::Identified;

mod arrivals;
pub use arrivals::{Event as ArrivalsEvent, ShipArrivals};

mod barge;
pub use barge::{next_transfer, BargeTender, Event as TenderEvent, FuelBarge, Transfer};

mod config;
pub use config::{ConfigError, Delay, HarbourConfig, ScriptedArrival, TimeDistribution};

mod monitor;
pub use monitor::{HarbourMonitor, QueueCategory, Recorder, Series, WaitSummary};

mod ship;
pub use ship::{Event as ShipEvent, Ship, ShipPhase, ShipProcess, ShipRecord};

mod simulation;
pub use simulation::{Harbour, HarbourSummary};

mod tug;
pub use tug::{Event as MaintenanceEvent, TugMaintenance, TugRegistry};

/// Log targets, one per message stream.
pub mod targets {
    /// Arrivals, dockings, exits, and tug maintenance.
    pub const ARRIVALS: &str = "harbour::arrivals";
    /// Cargo handling, bunkering, and barge refuelling.
    pub const DOCK: &str = "harbour::dock";
    /// Wait time summaries.
    pub const QUEUES: &str = "harbour::queues";
}

/// Priority of a normal ship.
pub const NORMAL_PRIORITY: i32 = 0;

/// Priority of a special ship.
pub const SPECIAL_PRIORITY: i32 = -1;

/// Priority of a tug taking itself out of service, higher than any ship request.
pub const MAINTENANCE_PRIORITY: i32 = -3;

/// Ship ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ShipId(usize);

/// Tug ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct TugId(usize);

/// Fuel barge ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct BargeId(usize);

/// Tugs are stored in the tug pool by their IDs.
impl Identified for TugId {
    type Id = TugId;

    fn id(&self) -> TugId {
        *self
    }
}
