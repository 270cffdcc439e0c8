#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// must go first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod actuator;
pub mod air_sensor;
pub mod analog;
pub mod board;
pub mod bus;
pub mod config;
pub mod device;
pub mod error;
pub mod sensor;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use actuator::GrowLight;
pub use board::{Board, BoardBuilder, InitReport, Subsystem};
pub use error::{ActuatorError, BusError, Error};
pub use telemetry::{Field, PlantTelemetrySnapshot};
