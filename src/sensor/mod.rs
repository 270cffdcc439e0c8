use crate::error::Error;

pub mod pushed;

pub use pushed::PushedReading;

/// Uniform pull contract the polling loop reads every sensor through.
///
/// Push driven sources are normalized to this contract by caching their
/// latest value, see [`PushedReading`].
pub trait Sensor {
    type Reading;

    async fn sample(&mut self) -> Result<Self::Reading, Error>;
}
