use float_cmp::approx_eq;
use rstest::{fixture, rstest};

use harbour::{
    Harbour, HarbourConfig, QueueCategory, ScriptedArrival, Series, ShipId, ShipPhase,
    TimeDistribution, TugId, SPECIAL_PRIORITY,
};

/// One dock, one tug, one barge, and no randomness in durations.
#[fixture]
fn config() -> HarbourConfig {
    HarbourConfig {
        docks: 1,
        tugs: 1,
        barges: 1,
        docking_time: TimeDistribution::fixed(1.0),
        cargo_time: TimeDistribution::fixed(4.0),
        bunkering_time: TimeDistribution::fixed(2.0),
        barge_refuel_time: TimeDistribution::fixed(1.0),
        maintenance_interval: TimeDistribution::fixed(1000.0),
        horizon: 100.0,
        ..HarbourConfig::default()
    }
}

fn assert_times(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{:?} != {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!(approx_eq!(f64, *a, *e, epsilon = 1e-9), "{:?} != {:?}", actual, expected);
    }
}

fn exited_at(harbour: &Harbour, id: usize) -> Option<f64> {
    harbour.ship(ShipId::from(id)).and_then(|r| r.exited_at())
}

#[rstest]
fn test_special_ship_waits_for_dock(config: HarbourConfig) {
    let mut harbour = Harbour::scripted(
        &config,
        vec![
            ScriptedArrival::at(0.0).fuel(100_000.0, 50_000.0),
            ScriptedArrival::at(0.5)
                .priority(SPECIAL_PRIORITY)
                .fuel(150_000.0, 60_000.0),
        ],
    )
    .unwrap();
    assert_eq!(harbour.run().unwrap(), 100.0);

    let monitor = harbour.monitor().unwrap();
    assert_times(monitor.waits(QueueCategory::Entrance), &[0.0, 5.5]);
    assert_times(monitor.waits(QueueCategory::Bunkering), &[0.0, 0.0]);
    assert_times(monitor.waits(QueueCategory::Exit), &[0.0, 0.0]);
    assert_eq!(monitor.current(Series::ShipsSupplied), 2);
    assert_eq!(monitor.current(Series::ShipsInSystem), 0);
    assert_eq!(monitor.current(Series::TugsInUse), 0);
    assert_eq!(
        monitor.series(Series::SpecialShipsWaiting),
        &[(0.0, 0), (0.5, 1), (6.0, 0)]
    );

    assert_eq!(exited_at(&harbour, 0), Some(6.0));
    assert_eq!(exited_at(&harbour, 1), Some(12.0));
    let special = harbour.ship(ShipId::from(1)).unwrap();
    assert_eq!(special.docked_at(), Some(7.0));
    assert_eq!(special.ship().fuel_level, 150_000.0);
    assert_eq!(special.phase(), ShipPhase::Exited);

    // 50 000 to the first ship, then the rest of the tank and 40 000 after a refill.
    assert_eq!(harbour.barge_levels().unwrap(), vec![60_000.0]);
    assert_eq!(harbour.idle_tugs().unwrap(), 1);
    assert_eq!(harbour.docks_in_use().unwrap(), 0);
}

#[rstest]
fn test_special_ship_overtakes_normal_ship(config: HarbourConfig) {
    let mut harbour = Harbour::scripted(
        &config,
        vec![
            ScriptedArrival::at(0.0).fuel(100_000.0, 50_000.0),
            ScriptedArrival::at(0.1).fuel(100_000.0, 50_000.0),
            ScriptedArrival::at(0.5)
                .priority(SPECIAL_PRIORITY)
                .fuel(100_000.0, 50_000.0),
        ],
    )
    .unwrap();
    harbour.run().unwrap();

    let monitor = harbour.monitor().unwrap();
    assert_times(monitor.waits(QueueCategory::Entrance), &[0.0, 5.5, 11.9]);
    let docked: Vec<_> = harbour.ships().iter().map(|r| r.docked_at()).collect();
    assert_eq!(docked, vec![Some(1.0), Some(13.0), Some(7.0)]);
    assert_eq!(exited_at(&harbour, 2), Some(12.0));
    assert_eq!(exited_at(&harbour, 1), Some(18.0));

    // The special ship empties the barge, which refills before serving the last ship.
    assert_eq!(harbour.barge_levels().unwrap(), vec![50_000.0]);
    let summary = monitor.summary(QueueCategory::Entrance).unwrap();
    assert_eq!(summary.count, 3);
    assert!(approx_eq!(f64, summary.max, 11.9, epsilon = 1e-9));
    assert!(approx_eq!(f64, summary.mean, 17.4 / 3.0, epsilon = 1e-9));
}

#[rstest]
fn test_whole_tank_then_refill(config: HarbourConfig) {
    let mut harbour = Harbour::scripted(
        &config,
        vec![ScriptedArrival::at(0.0).fuel(150_000.0, 20_000.0)],
    )
    .unwrap();
    harbour.run().unwrap();

    let record = harbour.ship(ShipId::from(0)).unwrap();
    assert_eq!(record.ship().fuel_level, 150_000.0);
    // Whole tank 1-3, refill 3-4, the remaining 30 000 in 4-6, and out in 6-7.
    assert_eq!(record.exited_at(), Some(7.0));
    assert_eq!(harbour.barge_levels().unwrap(), vec![70_000.0]);
    assert_eq!(
        harbour.monitor().unwrap().series(Series::BargesInUse),
        &[(0.0, 0), (1.0, 1), (6.0, 0)]
    );
}

#[rstest]
fn test_run_stops_at_horizon(config: HarbourConfig) {
    let mut harbour = Harbour::scripted(
        &HarbourConfig {
            horizon: 3.0,
            ..config
        },
        vec![ScriptedArrival::at(0.0).fuel(100_000.0, 50_000.0)],
    )
    .unwrap();
    assert_eq!(harbour.run().unwrap(), 3.0);
    assert_eq!(harbour.time(), 3.0);
    let record = harbour.ship(ShipId::from(0)).unwrap();
    assert_eq!(record.phase(), ShipPhase::Docked);
    // The transfer ending exactly at the horizon is left pending.
    assert_eq!(record.ship().fuel_level, 50_000.0);
    let monitor = harbour.monitor().unwrap();
    assert_eq!(monitor.current(Series::ShipsInSystem), 1);
    assert_eq!(monitor.current(Series::ShipsBunkering), 1);
    assert!(monitor.summary(QueueCategory::Exit).is_err());
}

#[rstest]
fn test_maintenance_due_mid_transport_takes_tug_first(config: HarbourConfig) {
    let mut harbour = Harbour::scripted(
        &HarbourConfig {
            docks: 2,
            maintenance_interval: TimeDistribution::fixed(0.5),
            maintenance_time_mean: 1e6,
            horizon: 1.5,
            ..config
        },
        vec![ScriptedArrival::at(0.0), ScriptedArrival::at(0.2)],
    )
    .unwrap();
    harbour.run().unwrap();

    let monitor = harbour.monitor().unwrap();
    assert_eq!(
        monitor.series(Series::TugsInMaintenance),
        &[(0.0, 0), (1.0, 1)]
    );
    assert_times(monitor.waits(QueueCategory::Entrance), &[0.0]);
    assert_eq!(
        harbour.ship(ShipId::from(0)).unwrap().phase(),
        ShipPhase::Docked
    );
    assert_eq!(
        harbour.ship(ShipId::from(1)).unwrap().phase(),
        ShipPhase::WaitingTugIn
    );
    assert_eq!(harbour.idle_tugs().unwrap(), 0);
    assert!(harbour.tug_registry().unwrap().in_maintenance(TugId::from(0)).unwrap());
}
