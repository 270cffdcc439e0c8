use embedded_hal_1::{digital, i2c, spi};

/// Failure of a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Nothing answered at the device address or the chip select failed.
    DeviceAbsent,
    /// Transport level failure, HAL timeouts included.
    Transfer,
    /// The device was never claimed during initialization.
    DeviceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorError {
    /// The relay bank failed to come up, no pin is driven.
    NotInitialized,
    /// Reading or writing the relay pin failed.
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Bus(BusError),
    Calibration(BusError),
    DeviceConfig(BusError),
    UnknownDevice(u8),
    EngineNotReady,
    InvalidChannel(u8),
    Actuator(ActuatorError),
    NoData,
    /// A board was built without one of its devices.
    MissingDevice,
}

impl From<BusError> for Error {
    fn from(value: BusError) -> Self {
        Error::Bus(value)
    }
}

impl From<ActuatorError> for Error {
    fn from(value: ActuatorError) -> Self {
        Error::Actuator(value)
    }
}

impl From<i2c::ErrorKind> for BusError {
    fn from(value: i2c::ErrorKind) -> Self {
        match value {
            i2c::ErrorKind::NoAcknowledge(_) => BusError::DeviceAbsent,
            i2c::ErrorKind::Bus => BusError::Transfer,
            i2c::ErrorKind::ArbitrationLoss => BusError::Transfer,
            i2c::ErrorKind::Overrun => BusError::Transfer,
            _ => BusError::Transfer,
        }
    }
}

impl From<spi::ErrorKind> for BusError {
    fn from(value: spi::ErrorKind) -> Self {
        match value {
            spi::ErrorKind::ChipSelectFault => BusError::DeviceAbsent,
            _ => BusError::Transfer,
        }
    }
}

impl From<digital::ErrorKind> for ActuatorError {
    fn from(_value: digital::ErrorKind) -> Self {
        ActuatorError::Pin
    }
}
