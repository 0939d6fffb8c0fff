use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use simcore::SimError;
use thiserror::Error;

use crate::NORMAL_PRIORITY;

/// Invalid value in a [`HarbourConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value must be strictly positive.
    #[error("`{field}` must be positive, got {value}")]
    NotPositive {
        /// Offending field.
        field: &'static str,
        /// Its value.
        value: f64,
    },
    /// Value must not be negative.
    #[error("`{field}` must not be negative, got {value}")]
    Negative {
        /// Offending field.
        field: &'static str,
        /// Its value.
        value: f64,
    },
    /// Value outside of an allowed range.
    #[error("`{field}` must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        /// Offending field.
        field: &'static str,
        /// Its value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

/// Normal distribution of a duration, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeDistribution {
    /// Mean.
    pub mean: f64,
    /// Standard deviation.
    pub std: f64,
}

impl TimeDistribution {
    /// Distribution with the given mean and standard deviation.
    #[must_use]
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// Distribution always producing `mean`.
    #[must_use]
    pub fn fixed(mean: f64) -> Self {
        Self { mean, std: 0.0 }
    }

    /// Builds the sampler.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDistribution`] for a negative or non-finite deviation.
    pub fn delay(&self) -> Result<Delay, SimError> {
        if !(self.std >= 0.0 && self.std.is_finite()) {
            return Err(SimError::InvalidDistribution(format!(
                "{:?}: standard deviation must be finite and non-negative",
                self
            )));
        }
        Normal::new(self.mean, self.std)
            .map(Delay)
            .map_err(|err| SimError::InvalidDistribution(format!("{:?}: {}", self, err)))
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        non_negative(field, self.mean)?;
        non_negative(field, self.std)
    }
}

/// Samples non-negative durations: the absolute value of a normally distributed draw.
#[derive(Debug, Clone, Copy)]
pub struct Delay(Normal<f64>);

impl Distribution<f64> for Delay {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.0.sample(rng).abs()
    }
}

/// A single arrival of a predefined scenario.
///
/// Fuel values that are not given are drawn at random like for any other ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedArrival {
    /// Arrival time, in hours since the start.
    pub time: f64,
    /// Ship priority.
    #[serde(default)]
    pub priority: i32,
    /// Fuel tank capacity, in liters.
    #[serde(default)]
    pub fuel_capacity: Option<f64>,
    /// Fuel level at arrival, in liters.
    #[serde(default)]
    pub fuel_level: Option<f64>,
}

impl ScriptedArrival {
    /// Normal-priority ship arriving at `time` with random fuel.
    #[must_use]
    pub fn at(time: f64) -> Self {
        Self {
            time,
            priority: NORMAL_PRIORITY,
            fuel_capacity: None,
            fuel_level: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the fuel capacity and level.
    #[must_use]
    pub fn fuel(mut self, capacity: f64, level: f64) -> Self {
        self.fuel_capacity = Some(capacity);
        self.fuel_level = Some(level);
        self
    }
}

/// Harbour simulation parameters. Durations are in hours, fuel in liters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarbourConfig {
    /// Mean number of ship arrivals per hour.
    pub arrival_rate: f64,
    /// Probability that an arriving ship is special.
    pub special_probability: f64,
    /// Number of docks.
    pub docks: usize,
    /// Number of tugs.
    pub tugs: usize,
    /// Number of fuel barges.
    pub barges: usize,
    /// Duration of a single fuel transfer from a barge to a ship.
    pub bunkering_time: TimeDistribution,
    /// Duration of loading and unloading.
    pub cargo_time: TimeDistribution,
    /// Duration of towing a ship in or out.
    pub docking_time: TimeDistribution,
    /// Duration of a barge refilling its tank.
    pub barge_refuel_time: TimeDistribution,
    /// Time between two maintenances of the same tug.
    pub maintenance_interval: TimeDistribution,
    /// Mean of the exponentially distributed maintenance duration.
    pub maintenance_time_mean: f64,
    /// Barge tank capacity.
    pub barge_capacity: f64,
    /// Barge refills once the tank falls below this percentage of its capacity.
    pub barge_threshold_percentage: f64,
    /// Simulation end time.
    pub horizon: f64,
    /// Seed of the random number generators.
    pub seed: u64,
}

impl Default for HarbourConfig {
    fn default() -> Self {
        Self {
            arrival_rate: 5.0,
            special_probability: 0.2,
            docks: 20,
            tugs: 8,
            barges: 8,
            bunkering_time: TimeDistribution::new(2.0, 0.25),
            cargo_time: TimeDistribution::new(4.0, 0.5),
            docking_time: TimeDistribution::new(1.0, 0.125),
            barge_refuel_time: TimeDistribution::new(1.0, 0.25),
            maintenance_interval: TimeDistribution::new(24.0, 4.0),
            maintenance_time_mean: 5.0,
            barge_capacity: 100_000.0,
            barge_threshold_percentage: 20.0,
            horizon: 120.0,
            seed: 17,
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl HarbourConfig {
    /// Checks that all values make sense.
    ///
    /// Zero docks, tugs, or barges are accepted: ships simply never get served.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("arrival_rate", self.arrival_rate)?;
        in_range("special_probability", self.special_probability, 0.0, 1.0)?;
        self.bunkering_time.validate("bunkering_time")?;
        self.cargo_time.validate("cargo_time")?;
        self.docking_time.validate("docking_time")?;
        self.barge_refuel_time.validate("barge_refuel_time")?;
        self.maintenance_interval.validate("maintenance_interval")?;
        positive("maintenance_time_mean", self.maintenance_time_mean)?;
        positive("barge_capacity", self.barge_capacity)?;
        in_range(
            "barge_threshold_percentage",
            self.barge_threshold_percentage,
            0.0,
            100.0,
        )?;
        non_negative("horizon", self.horizon)
    }

    /// Tank level below which a barge refills.
    #[must_use]
    pub fn barge_threshold(&self) -> f64 {
        (self.barge_capacity * self.barge_threshold_percentage / 100.0).floor()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = HarbourConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.barge_threshold(), 20_000.0);
    }

    #[test]
    fn test_partial_json() {
        let config: HarbourConfig =
            serde_json::from_str(r#"{"docks": 1, "cargo_time": {"mean": 3.0, "std": 0.0}}"#)
                .unwrap();
        assert_eq!(config.docks, 1);
        assert_eq!(config.cargo_time, TimeDistribution::fixed(3.0));
        assert_eq!(config.tugs, 8);
        assert!(serde_json::from_str::<HarbourConfig>(r#"{"dogs": 1}"#).is_err());
    }

    #[rstest(
        config,
        field,
        case(HarbourConfig { arrival_rate: 0.0, ..HarbourConfig::default() }, "arrival_rate"),
        case(HarbourConfig { special_probability: 1.5, ..HarbourConfig::default() }, "special_probability"),
        case(HarbourConfig { cargo_time: TimeDistribution::new(4.0, -1.0), ..HarbourConfig::default() }, "cargo_time"),
        case(HarbourConfig { barge_threshold_percentage: 101.0, ..HarbourConfig::default() }, "barge_threshold_percentage"),
        case(HarbourConfig { maintenance_time_mean: -5.0, ..HarbourConfig::default() }, "maintenance_time_mean")
    )]
    fn test_invalid(config: HarbourConfig, field: &str) {
        let reported = match config.validate() {
            Err(ConfigError::NotPositive { field, .. })
            | Err(ConfigError::Negative { field, .. })
            | Err(ConfigError::OutOfRange { field, .. }) => field,
            Ok(()) => panic!("config should be invalid"),
        };
        assert_eq!(reported, field);
    }

    #[test]
    fn test_delay_is_never_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let delay = TimeDistribution::new(0.0, 1.0).delay().unwrap();
        assert!((0..1000).all(|_| delay.sample(&mut rng) >= 0.0));
        let fixed = TimeDistribution::fixed(2.5).delay().unwrap();
        assert_eq!(fixed.sample(&mut rng), 2.5);
    }

    #[rstest(
        std,
        case(-1.0),
        case(-1e-9),
        case(f64::NAN),
        case(f64::INFINITY)
    )]
    fn test_invalid_deviation(std: f64) {
        assert!(matches!(
            TimeDistribution::new(1.0, std).delay(),
            Err(SimError::InvalidDistribution(_))
        ));
    }
}
