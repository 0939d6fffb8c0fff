use std::collections::HashMap;

use rand::Rng;
use rand_distr::Distribution;
use simcore::{
    Component, ComponentId, FilteredPriorityPool, Join, Key, Pool, PriorityResource,
    Resume, Scheduler, Selector, SimError, Slot, State,
};

use crate::barge::{self, next_transfer, FuelBarge, Transfer};
use crate::{targets, Delay, Recorder, ShipId, TugId, TugRegistry, NORMAL_PRIORITY};

/// A ship visiting the harbour.
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    /// Ship ID.
    pub id: ShipId,
    /// Priority of its requests for docks and tugs: the lower, the sooner it is served.
    pub priority: i32,
    /// Fuel tank capacity, in liters.
    pub fuel_capacity: f64,
    /// Current fuel level, in liters.
    pub fuel_level: f64,
}

impl Ship {
    /// Generates a ship with a capacity between 50 000 and 150 000 liters in steps of 10 000,
    /// filled between 40 and 80 percent.
    pub fn random<R: Rng>(id: ShipId, priority: i32, rng: &mut R) -> Self {
        let fuel_capacity = f64::from(rng.gen_range(5..=15_u32) * 10_000);
        let fuel_level = rng
            .gen_range(0.4 * fuel_capacity..=0.8 * fuel_capacity)
            .floor();
        Self {
            id,
            priority,
            fuel_capacity,
            fuel_level,
        }
    }

    /// Answers whether the ship has precedence over normal ships.
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.priority < NORMAL_PRIORITY
    }

    /// Fuel needed to fill the tank.
    #[must_use]
    pub fn missing_fuel(&self) -> f64 {
        self.fuel_capacity - self.fuel_level
    }
}

/// Lifecycle of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipPhase {
    /// Waiting for a dock.
    WaitingDock,
    /// Has a dock, waiting for a tug to get in.
    WaitingTugIn,
    /// Being towed to the dock.
    Docking,
    /// At the dock: unloading and bunkering.
    Docked,
    /// Done at the dock, waiting for a tug to get out.
    WaitingTugOut,
    /// Being towed out.
    Undocking,
    /// Left the harbour.
    Exited,
}

/// What the harbour knows about a ship.
#[derive(Debug)]
pub struct ShipRecord {
    ship: Ship,
    phase: ShipPhase,
    arrived_at: f64,
    docked_at: Option<f64>,
    exited_at: Option<f64>,
    wait_start: f64,
    bunkering_wait_start: f64,
    dock: Option<Slot>,
    tug: Option<TugId>,
    barge: Option<FuelBarge>,
    supplied: bool,
    service: Option<Key<Join>>,
}

impl ShipRecord {
    fn new(ship: Ship, now: f64) -> Self {
        Self {
            ship,
            phase: ShipPhase::WaitingDock,
            arrived_at: now,
            docked_at: None,
            exited_at: None,
            wait_start: now,
            bunkering_wait_start: now,
            dock: None,
            tug: None,
            barge: None,
            supplied: false,
            service: None,
        }
    }

    /// The ship.
    #[must_use]
    pub fn ship(&self) -> &Ship {
        &self.ship
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ShipPhase {
        self.phase
    }

    /// Arrival time.
    #[must_use]
    pub fn arrived_at(&self) -> f64 {
        self.arrived_at
    }

    /// Time the ship reached its dock.
    #[must_use]
    pub fn docked_at(&self) -> Option<f64> {
        self.docked_at
    }

    /// Time the ship left the harbour.
    #[must_use]
    pub fn exited_at(&self) -> Option<f64> {
        self.exited_at
    }
}

/// Ship events.
#[derive(Debug)]
pub enum Event {
    /// A new ship arrived.
    Arrived(Ship),
    /// The ship got a dock.
    DockGranted(ShipId, Slot),
    /// The ship got a tug, to get in or out depending on its phase.
    TugGranted(ShipId, TugId),
    /// The tug finished towing the ship.
    TransportFinished(ShipId),
    /// Loading and unloading is over.
    CargoFinished(ShipId),
    /// The ship got a barge.
    BargeGranted(ShipId, FuelBarge),
    /// Fuel of a bunkering round was taken out of the barge tank.
    FuelTaken(ShipId, Transfer),
    /// Fuel of a bunkering round was transferred to the ship.
    TransferFinished(ShipId, Transfer),
    /// The barge serving the ship has refilled its tank.
    BargeRefueled(ShipId),
    /// Cargo handling and bunkering are both over.
    ServiceFinished(ShipId),
}

/// Keys of the shared harbour resources in the simulation state.
pub(crate) struct Resources<M> {
    pub docks: Key<PriorityResource>,
    pub tugs: Key<FilteredPriorityPool<TugId>>,
    pub barges: Key<Pool<FuelBarge>>,
    pub registry: Key<TugRegistry>,
    pub monitor: Key<M>,
}

impl<M> Clone for Resources<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Resources<M> {}

pub(crate) struct Durations {
    pub docking: Delay,
    pub cargo: Delay,
    pub bunkering: Delay,
}

/// Drives every ship from arrival to exit:
/// dock, tug in, cargo handling alongside bunkering, tug out.
///
/// A ship first gets a dock and then a tug, both with its own priority. Once towed in, it
/// unloads and gets bunkered at the same time, and leaves only when both are over. To leave, it
/// requests a tug with a priority one higher than its own, and frees its dock as soon as it
/// gets one.
pub struct ShipProcess<R, M> {
    rng: R,
    durations: Durations,
    resources: Resources<M>,
    tender: ComponentId<barge::Event>,
    ships: HashMap<ShipId, ShipRecord>,
}

impl<R: Rng, M: Recorder + 'static> ShipProcess<R, M> {
    pub(crate) fn new(
        rng: R,
        durations: Durations,
        resources: Resources<M>,
        tender: ComponentId<barge::Event>,
    ) -> Self {
        Self {
            rng,
            durations,
            resources,
            tender,
            ships: HashMap::new(),
        }
    }

    /// The record of the ship with ID `id`, if it has arrived.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&ShipRecord> {
        self.ships.get(&id)
    }

    /// Iterates over all ships that have arrived, in no particular order.
    pub fn ships(&self) -> impl Iterator<Item = &ShipRecord> {
        self.ships.values()
    }

    fn record(&mut self, id: ShipId) -> Result<&mut ShipRecord, SimError> {
        self.ships
            .get_mut(&id)
            .ok_or(SimError::MissingState("ship record"))
    }

    fn arrive(
        &mut self,
        self_id: ComponentId<Event>,
        ship: Ship,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let (id, priority) = (ship.id, ship.priority);
        state.fetch_mut(self.resources.monitor)?.ship_arrived(priority);
        if ship.is_special() {
            log::info!(
                target: targets::ARRIVALS,
                "[{:.3}]: Special ship {} arrived!",
                scheduler.time(),
                id
            );
        } else {
            log::info!(
                target: targets::ARRIVALS,
                "[{:.3}]: Ship {} arrived!",
                scheduler.time(),
                id
            );
        }
        self.ships.insert(id, ShipRecord::new(ship, scheduler.time()));
        state.fetch_mut(self.resources.docks)?.request(
            priority,
            Resume::new(self_id, move |slot| Event::DockGranted(id, slot)),
            scheduler,
        );
        Ok(())
    }

    fn request_tug(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        priority: i32,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        state.fetch_mut(self.resources.tugs)?.get(
            priority,
            Selector::Any,
            Resume::new(self_id, move |tug| Event::TugGranted(id, tug)),
            scheduler,
        );
        Ok(())
    }

    fn start_transport(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        tug: TugId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        state.fetch_mut(self.resources.registry)?.start_transport(tug)?;
        self.record(id)?.tug = Some(tug);
        let delay = self.durations.docking.sample(&mut self.rng);
        scheduler.schedule(delay, self_id, Event::TransportFinished(id))?;
        Ok(())
    }

    fn tug_granted(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        tug: TugId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let now = scheduler.time();
        let Resources { docks, monitor, .. } = self.resources;
        let record = self.record(id)?;
        let waited = now - record.wait_start;
        let priority = record.ship.priority;
        match record.phase {
            ShipPhase::WaitingTugIn => {
                record.phase = ShipPhase::Docking;
                let monitor = state.fetch_mut(monitor)?;
                monitor.entrance_wait(waited);
                monitor.docking_started(priority);
                log::info!(
                    target: targets::ARRIVALS,
                    "[{:.3}]: Ship {} obtained tug {}.",
                    now,
                    id,
                    tug
                );
                log::info!(
                    target: targets::ARRIVALS,
                    "[{:.3}]: Ship {} starts docking.",
                    now,
                    id
                );
            }
            ShipPhase::WaitingTugOut => {
                record.phase = ShipPhase::Undocking;
                let slot = record
                    .dock
                    .take()
                    .ok_or(SimError::MissingState("dock slot"))?;
                let monitor = state.fetch_mut(monitor)?;
                monitor.exit_wait(waited);
                monitor.tug_locked();
                monitor.ship_supplied();
                state.fetch_mut(docks)?.release(slot, scheduler)?;
            }
            _ => return Err(SimError::MissingState("ship waiting for a tug")),
        }
        self.start_transport(self_id, id, tug, scheduler, state)
    }

    fn transport_finished(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let now = scheduler.time();
        let record = self.record(id)?;
        let tug = record.tug.take().ok_or(SimError::MissingState("tug"))?;
        let phase = record.phase;
        state.fetch_mut(self.resources.tugs)?.put(tug, scheduler)?;
        state
            .fetch_mut(self.resources.registry)?
            .finish_transport(tug)?;
        match phase {
            ShipPhase::Docking => {
                state.fetch_mut(self.resources.monitor)?.docking_completed();
                log::info!(
                    target: targets::ARRIVALS,
                    "[{:.3}]: Ship {} completed docking.",
                    now,
                    id
                );
                self.start_service(self_id, id, scheduler, state)
            }
            ShipPhase::Undocking => {
                let record = self.record(id)?;
                record.phase = ShipPhase::Exited;
                record.exited_at = Some(now);
                let monitor = state.fetch_mut(self.resources.monitor)?;
                monitor.tug_released();
                monitor.ship_exited();
                log::info!(target: targets::ARRIVALS, "[{:.3}]: Ship {} exited.", now, id);
                Ok(())
            }
            _ => Err(SimError::MissingState("ship being towed")),
        }
    }

    /// Forks cargo handling and bunkering, joined by [`Event::ServiceFinished`].
    fn start_service(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let now = scheduler.time();
        let join = state.insert(Join::new(
            2,
            Resume::new(self_id, move |()| Event::ServiceFinished(id)),
        ));
        let record = self.record(id)?;
        record.phase = ShipPhase::Docked;
        record.docked_at = Some(now);
        record.bunkering_wait_start = now;
        record.service = Some(join);

        log::info!(target: targets::DOCK, "[{:.3}]: Ship {} starts unloading.", now, id);
        let cargo = self.durations.cargo.sample(&mut self.rng);
        scheduler.schedule(cargo, self_id, Event::CargoFinished(id))?;

        state.fetch_mut(self.resources.barges)?.get(
            Resume::new(self_id, move |barge| Event::BargeGranted(id, barge)),
            scheduler,
        );
        Ok(())
    }

    /// Starts the next bunkering round, see [`next_transfer`].
    fn bunker(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let record = self.record(id)?;
        let barge = record.barge.ok_or(SimError::MissingState("barge"))?;
        let ship = &record.ship;
        let tank = state.fetch_mut(barge.tank)?;
        log::info!(
            target: targets::DOCK,
            "[{:.3}]: Ship {} with fuel {:.0}:{:.0} bunkering from barge {} with level {:.0}.",
            scheduler.time(),
            id,
            ship.fuel_capacity,
            ship.fuel_level,
            barge.id,
            tank.level()
        );
        let transfer = next_transfer(ship.missing_fuel(), tank.level(), tank.capacity());
        tank.get(
            transfer.amount(),
            Resume::new(self_id, move |_| Event::FuelTaken(id, transfer)),
            scheduler,
        )
    }

    fn refuel_barge(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        scheduler: &mut Scheduler,
    ) -> Result<(), SimError> {
        let barge = self.record(id)?.barge.ok_or(SimError::MissingState("barge"))?;
        scheduler.schedule_immediately(
            self.tender,
            barge::Event::Refuel {
                barge,
                done: Resume::new(self_id, move |()| Event::BargeRefueled(id)),
            },
        );
        Ok(())
    }

    fn fuel_taken(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        transfer: Transfer,
        scheduler: &mut Scheduler,
    ) -> Result<(), SimError> {
        match transfer {
            Transfer::WholeTank(_) | Transfer::Missing(_) => {
                let delay = self.durations.bunkering.sample(&mut self.rng);
                scheduler.schedule(delay, self_id, Event::TransferFinished(id, transfer))?;
                Ok(())
            }
            Transfer::Remainder(amount) => {
                self.record(id)?.ship.fuel_level += amount;
                self.refuel_barge(self_id, id, scheduler)
            }
        }
    }

    fn transfer_finished(
        &mut self,
        self_id: ComponentId<Event>,
        id: ShipId,
        transfer: Transfer,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let record = self.record(id)?;
        record.ship.fuel_level += transfer.amount();
        if let Transfer::WholeTank(_) = transfer {
            return self.refuel_barge(self_id, id, scheduler);
        }
        record.supplied = true;
        let barge = record.barge.ok_or(SimError::MissingState("barge"))?;
        let done = Resume::new(self_id, move |()| Event::BargeRefueled(id));
        if barge.check_tank(self.tender, done, scheduler, state)? {
            Ok(())
        } else {
            self.finish_bunkering(id, scheduler, state)
        }
    }

    fn finish_bunkering(
        &mut self,
        id: ShipId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), SimError> {
        let record = self.record(id)?;
        let barge = record.barge.take().ok_or(SimError::MissingState("barge"))?;
        let service = record.service.ok_or(SimError::MissingState("service join"))?;
        log::info!(
            target: targets::DOCK,
            "[{:.3}]: Ship {} supplied.",
            scheduler.time(),
            id
        );
        state.fetch_mut(self.resources.barges)?.put(barge, scheduler)?;
        state.fetch_mut(self.resources.monitor)?.bunkering_completed();
        service_part_finished(service, scheduler, state)
    }
}

fn service_part_finished(
    service: Key<Join>,
    scheduler: &mut Scheduler,
    state: &mut State,
) -> Result<(), SimError> {
    if state.fetch_mut(service)?.arrive(scheduler)? {
        state.remove(service);
    }
    Ok(())
}

impl<R, M> Component for ShipProcess<R, M>
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
            Event::Arrived(ship) => self.arrive(self_id, ship, scheduler, state),
            Event::DockGranted(id, slot) => {
                log::info!(
                    target: targets::ARRIVALS,
                    "[{:.3}]: Ship {} obtained dock.",
                    scheduler.time(),
                    id
                );
                let record = self.record(id)?;
                record.dock = Some(slot);
                record.phase = ShipPhase::WaitingTugIn;
                let priority = record.ship.priority;
                self.request_tug(self_id, id, priority, scheduler, state)
            }
            Event::TugGranted(id, tug) => self.tug_granted(self_id, id, tug, scheduler, state),
            Event::TransportFinished(id) => self.transport_finished(self_id, id, scheduler, state),
            Event::CargoFinished(id) => {
                log::info!(
                    target: targets::DOCK,
                    "[{:.3}]: Ship {} completed unloading.",
                    scheduler.time(),
                    id
                );
                let service = self
                    .record(id)?
                    .service
                    .ok_or(SimError::MissingState("service join"))?;
                service_part_finished(service, scheduler, state)
            }
            Event::BargeGranted(id, barge) => {
                let now = scheduler.time();
                let record = self.record(id)?;
                record.barge = Some(barge);
                let waited = now - record.bunkering_wait_start;
                let monitor = state.fetch_mut(self.resources.monitor)?;
                monitor.bunkering_wait(waited);
                monitor.bunkering_started();
                self.bunker(self_id, id, scheduler, state)
            }
            Event::FuelTaken(id, transfer) => self.fuel_taken(self_id, id, transfer, scheduler),
            Event::TransferFinished(id, transfer) => {
                self.transfer_finished(self_id, id, transfer, scheduler, state)
            }
            Event::BargeRefueled(id) => {
                if self.record(id)?.supplied {
                    self.finish_bunkering(id, scheduler, state)
                } else {
                    self.bunker(self_id, id, scheduler, state)
                }
            }
            Event::ServiceFinished(id) => {
                let record = self.record(id)?;
                record.phase = ShipPhase::WaitingTugOut;
                record.wait_start = scheduler.time();
                record.service = None;
                let priority = record.ship.priority - 1;
                self.request_tug(self_id, id, priority, scheduler, state)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_ship_fuel() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for id in 0..500 {
            let ship = Ship::random(ShipId::from(id), NORMAL_PRIORITY, &mut rng);
            assert_eq!(ship.fuel_capacity % 10_000.0, 0.0);
            assert!((50_000.0..=150_000.0).contains(&ship.fuel_capacity));
            assert!(ship.fuel_level >= 0.4 * ship.fuel_capacity);
            assert!(ship.fuel_level <= 0.8 * ship.fuel_capacity);
            assert_eq!(ship.fuel_level.fract(), 0.0);
            assert!(!ship.is_special());
        }
    }
}
