//! 8 channel, 10 bit analog front end (MCP3008) on a SPI device.

use embedded_hal_async::spi::SpiDevice;

use crate::bus::transfer_full_duplex;
use crate::device::Device;
use crate::error::{BusError, Error};
use crate::sensor::Sensor;

pub const CHANNELS: u8 = 8;

const START_BIT: u8 = 0x01;
const SINGLE_ENDED: u8 = 0x08;

pub struct Mcp3008<SPI> {
    spi: SPI,
    claimed: bool,
}

impl<SPI: SpiDevice> Mcp3008<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi, claimed: false }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    /// Forgets the claim, reads fail with `DeviceUnavailable` until the next `init`.
    pub fn invalidate(&mut self) {
        self.claimed = false;
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    pub async fn read_channel(&mut self, channel: u8) -> Result<u16, Error> {
        if channel >= CHANNELS {
            return Err(Error::InvalidChannel(channel));
        }

        if !self.claimed {
            return Err(BusError::DeviceUnavailable.into());
        }

        self.convert(channel).await.map_err(Error::Bus)
    }

    /// Borrow a single channel as a pull sensor.
    pub fn channel(&mut self, channel: u8) -> AnalogChannel<'_, SPI> {
        AnalogChannel { adc: self, channel }
    }

    async fn convert(&mut self, channel: u8) -> Result<u16, BusError> {
        let response = transfer_full_duplex(&mut self.spi, request(channel)).await?;

        Ok(code(response))
    }
}

fn request(channel: u8) -> [u8; 3] {
    [START_BIT, (SINGLE_ENDED + channel) << 4, 0]
}

fn code(response: [u8; 3]) -> u16 {
    (u16::from(response[1] & 0x03) << 8) | u16::from(response[2])
}

impl<SPI: SpiDevice, D> Device<D> for Mcp3008<SPI> {
    type Info = u16;

    /// Claims the converter with one probe conversion on channel 0.
    async fn init(&mut self, _delay: &mut D) -> Result<u16, Error> {
        match self.convert(0).await {
            Ok(probe) => {
                self.claimed = true;
                info!("analog: converter claimed, channel 0 reads {=u16}", probe);
                Ok(probe)
            }
            Err(e) => {
                self.claimed = false;
                error!("analog: failed to claim converter {}", e);
                Err(Error::Bus(e))
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.claimed
    }
}

pub struct AnalogChannel<'a, SPI> {
    adc: &'a mut Mcp3008<SPI>,
    channel: u8,
}

impl<SPI: SpiDevice> Sensor for AnalogChannel<'_, SPI> {
    type Reading = u16;

    async fn sample(&mut self) -> Result<u16, Error> {
        let raw = self.adc.read_channel(self.channel).await?;
        debug!("analog: channel {=u8} raw {=u16}", self.channel, raw);

        Ok(raw)
    }
}
