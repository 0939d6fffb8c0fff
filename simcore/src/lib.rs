#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

//! A cooperative discrete-event simulation core: a virtual clock with an ordered event queue,
//! components that process events as explicit state machines, a keyed state store, and the
//! synchronization primitives components use to wait on each other.
//!
//! # Suspension
//!
//! A component "suspends" in one of three ways:
//! - it schedules a delayed event to itself with [`Scheduler::schedule`],
//! - it hands a [`Resume`] continuation to a resource ([`PriorityResource`], [`Pool`],
//!   [`FilteredPriorityPool`], [`Container`]),
//! - it hands a [`Resume`] to a [`Join`] that fires once all child tasks have arrived.
//!
//! Continuations always resume through the event queue at the current time, so the order in which
//! waiting components run is decided by the `(time, sequence)` order of events alone.

use std::cell::Cell;
use std::rc::Rc;

/// Simulation clock, in hours.
pub type Clock = Rc<Cell<f64>>;

pub use component::{Component, ComponentId, Components};
pub use error::SimError;
pub use join::Join;
pub use resource::{
    Container, FilteredPriorityPool, Identified, Pool, PriorityResource, RequestKey, Selector, Slot,
};
pub use resume::Resume;
pub use scheduler::{ClockRef, EventEntry, EventEntryTyped, EventId, Scheduler};
pub use simulation::Simulation;
pub use state::{Key, State};

mod component;
mod error;
mod join;
mod resource;
mod resume;
mod scheduler;
mod simulation;
mod state;
