use embassy_time::Duration;

use crate::actuator::GrowLight;

pub struct Config;

impl Config {
    pub const I2C_ADDR_AIR_SENSOR: u8 = 0x77;
    pub const I2C_FREQUENCY: u32 = 400_000;

    // 3.6 MHz is the MCP3008 limit at 5 V
    pub const SPI_FREQUENCY: u32 = 3_600_000;

    pub const MOISTURE_CHANNELS: [u8; 3] = [0, 1, 2];
    pub const LIGHT_CHANNEL: u8 = 4;

    pub const GROW_LIGHTS: [GrowLight; 3] = [GrowLight::Light1, GrowLight::Light2, GrowLight::Light3];
}

/// Register values written to the air sensor when it enters continuous mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AirSensorConfig {
    /// ctrl_hum (0xF2), humidity oversampling
    pub ctrl_hum: u8,
    /// ctrl_meas (0xF4), temperature/pressure oversampling and power mode
    pub ctrl_meas: u8,
    /// config (0xF5), standby time and IIR filter
    pub config: u8,
}

impl Default for AirSensorConfig {
    fn default() -> Self {
        Self {
            ctrl_hum: 0x03,  // humidity x4
            ctrl_meas: 0x3f, // temperature x1, pressure x16, normal mode
            config: 0x00,    // 0.5 ms standby, filter off
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MonitorConfig {
    /// Delay between two polling cycles
    pub poll_period: Duration,
    /// Reference pressure used for the altitude estimate
    pub sea_level_hpa: f32,
    /// Upper bound of the re-initialization backoff, in polling cycles
    pub max_backoff_cycles: u32,
    pub air: AirSensorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_millis(500),
            sea_level_hpa: 1013.25,
            max_backoff_cycles: 64,
            air: AirSensorConfig::default(),
        }
    }
}
