//! BME280 temperature, pressure and humidity sensor.

pub mod calibration;
pub mod compensation;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::bus::RegisterDevice;
use crate::config::AirSensorConfig;
use crate::device::Device;
use crate::error::{BusError, Error};
use crate::sensor::Sensor;

pub use calibration::CalibrationCoefficients;
use compensation::{
    compensate_humidity, compensate_pressure, compensate_temperature, raw_sample, HUMIDITY_DIVISOR, PRESSURE_DIVISOR,
};

const CHIP_ID: u8 = 0x60;

const REG_CHIP_ID: u8 = 0xd0;
const REG_CTRL_HUM: u8 = 0xf2;
const REG_CTRL_MEAS: u8 = 0xf4;
const REG_CONFIG: u8 = 0xf5;
const REG_DATA: u8 = 0xf7;

const DATA_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    Uninitialized,
    CoefficientsLoaded(CalibrationCoefficients),
    Ready(CalibrationCoefficients),
}

/// Raw ADC codes of one conversion, read in a single burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMeasurement {
    pub pressure: u32,
    pub temperature: u32,
    pub humidity: u16,
}

impl From<[u8; DATA_LEN]> for RawMeasurement {
    fn from(data: [u8; DATA_LEN]) -> Self {
        Self {
            pressure: raw_sample(data[0], data[1], data[2]),
            temperature: raw_sample(data[3], data[4], data[5]),
            humidity: u16::from_be_bytes([data[6], data[7]]),
        }
    }
}

/// Compensated values of one sampling pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvironmentReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// `None` when the pressure formula hit its zero denominator guard.
    pub pressure_pa: Option<f32>,
}

pub struct AirSensor<I2C> {
    dev: RegisterDevice<I2C>,
    config: AirSensorConfig,
    state: EngineState,
}

impl<I2C: I2c> AirSensor<I2C> {
    pub fn new(addr: u8, bus: I2C, config: AirSensorConfig) -> Self {
        Self {
            dev: RegisterDevice::new(addr, bus),
            config,
            state: EngineState::Uninitialized,
        }
    }

    pub fn release(self) -> I2C {
        self.dev.release()
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        self.dev.bus_mut()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Drops back to `Uninitialized`, the next `init` starts from scratch.
    pub fn invalidate(&mut self) {
        self.state = EngineState::Uninitialized;
    }

    pub async fn chip_id(&mut self) -> Result<u8, Error> {
        let id = self.dev.register_read(REG_CHIP_ID).await?;
        if id != CHIP_ID {
            return Err(Error::UnknownDevice(id));
        }

        Ok(id)
    }

    pub async fn load_calibration(&mut self) -> Result<CalibrationCoefficients, Error> {
        match CalibrationCoefficients::read(&mut self.dev).await {
            Ok(calib) => {
                self.state = EngineState::CoefficientsLoaded(calib);
                debug!("air sensor: calibration {}", calib);
                Ok(calib)
            }
            Err(e) => {
                self.state = EngineState::Uninitialized;
                Err(Error::Calibration(e))
            }
        }
    }

    /// Starts continuous conversion. ctrl_hum only latches on the following
    /// ctrl_meas write, so the order matters.
    pub async fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        let calib = match self.state {
            EngineState::Uninitialized => return Err(Error::EngineNotReady),
            EngineState::CoefficientsLoaded(calib) | EngineState::Ready(calib) => calib,
        };

        self.write_control_registers().await.map_err(Error::DeviceConfig)?;
        delay.delay_ms(1).await;

        self.state = EngineState::Ready(calib);

        Ok(())
    }

    pub fn coefficients(&self) -> Result<&CalibrationCoefficients, Error> {
        match &self.state {
            EngineState::Ready(calib) => Ok(calib),
            _ => Err(Error::EngineNotReady),
        }
    }

    pub async fn read_raw(&mut self) -> Result<RawMeasurement, Error> {
        let mut data = [0u8; DATA_LEN];
        self.dev.register_read_burst(REG_DATA, &mut data).await?;

        Ok(RawMeasurement::from(data))
    }

    /// One full sampling pass. Temperature is compensated first and its fine
    /// value feeds pressure and humidity of the same pass only.
    pub async fn measure(&mut self) -> Result<EnvironmentReading, Error> {
        let calib = *self.coefficients()?;
        let raw = self.read_raw().await?;

        let (temperature_c, fine) = compensate_temperature(&calib, raw.temperature);
        let pressure_q = compensate_pressure(&calib, raw.pressure, fine);
        let humidity_q = compensate_humidity(&calib, raw.humidity, fine);

        let pressure_pa = if pressure_q == 0 {
            warn!("air sensor: pressure compensation hit zero denominator");
            None
        } else {
            Some(pressure_q as f32 / PRESSURE_DIVISOR)
        };

        Ok(EnvironmentReading {
            temperature_c: temperature_c as f32,
            humidity_pct: humidity_q as f32 / HUMIDITY_DIVISOR,
            pressure_pa,
        })
    }

    pub async fn read_temperature(&mut self) -> Result<f32, Error> {
        Ok(self.measure().await?.temperature_c)
    }

    /// Runs a fresh pass, temperature included, before compensating humidity.
    pub async fn read_humidity(&mut self) -> Result<f32, Error> {
        Ok(self.measure().await?.humidity_pct)
    }

    /// Runs a fresh pass, temperature included, before compensating pressure.
    pub async fn read_pressure(&mut self) -> Result<f32, Error> {
        self.measure().await?.pressure_pa.ok_or(Error::NoData)
    }

    pub async fn read_altitude(&mut self, sea_level_hpa: f32) -> Result<f32, Error> {
        let pressure_pa = self.read_pressure().await?;

        Ok(compensation::altitude(pressure_pa / 100.0, sea_level_hpa))
    }

    async fn write_control_registers(&mut self) -> Result<(), BusError> {
        self.dev.register_write(REG_CTRL_HUM, self.config.ctrl_hum).await?;
        self.dev.register_write(REG_CTRL_MEAS, self.config.ctrl_meas).await?;
        self.dev.register_write(REG_CONFIG, self.config.config).await
    }
}

impl<I2C: I2c, D: DelayNs> Device<D> for AirSensor<I2C> {
    type Info = CalibrationCoefficients;

    async fn init(&mut self, delay: &mut D) -> Result<CalibrationCoefficients, Error> {
        self.state = EngineState::Uninitialized;

        let id = self.chip_id().await?;
        info!("air sensor: chip id {=u8:#x}", id);

        let calib = self.load_calibration().await?;
        self.configure(delay).await?;
        info!("air sensor: continuous conversion started");

        Ok(calib)
    }

    fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }
}

impl<I2C: I2c> Sensor for AirSensor<I2C> {
    type Reading = EnvironmentReading;

    async fn sample(&mut self) -> Result<EnvironmentReading, Error> {
        self.measure().await
    }
}
