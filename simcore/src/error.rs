use thiserror::Error;

/// Errors raised by the simulation core.
///
/// All of them except [`SimError::EmptySampleSet`] abort a running simulation: they signal either
/// an invalid request from a component or a broken invariant in the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A timeout was requested with a negative or non-finite delay.
    #[error("cannot schedule an event with delay {0}")]
    InvalidDelay(f64),
    /// A put or release would leave a resource above its declared capacity.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
    /// A container operation was requested with a negative or non-finite amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    /// A summary was requested for a category without any samples.
    #[error("no samples recorded for {0}")]
    EmptySampleSet(String),
    /// A value expected in the simulation state was not found.
    #[error("missing simulation state: {0}")]
    MissingState(&'static str),
    /// Parameters of a random distribution were rejected.
    #[error("invalid distribution parameters: {0}")]
    InvalidDistribution(String),
}
