//! Register and full-duplex bus capabilities the devices are written against.

use embedded_hal_1::i2c::Error as _;
use embedded_hal_1::spi::Error as _;
use embedded_hal_async::i2c::I2c;
use embedded_hal_async::spi::SpiDevice;

use crate::error::BusError;

/// Byte-register device behind a 7-bit I2C address.
pub struct RegisterDevice<I2C> {
    addr: u8,
    bus: I2C,
}

impl<I2C: I2c> RegisterDevice<I2C> {
    pub fn new(addr: u8, bus: I2C) -> Self {
        Self { addr, bus }
    }

    pub fn release(self) -> I2C {
        self.bus
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        &mut self.bus
    }

    pub async fn register_read(&mut self, register: u8) -> Result<u8, BusError> {
        let mut buffer = [0u8; 1];
        self.register_read_burst(register, &mut buffer).await?;

        Ok(buffer[0])
    }

    /// Two consecutive registers, low byte first.
    pub async fn register_read16_le(&mut self, register: u8) -> Result<u16, BusError> {
        let mut buffer = [0u8; 2];
        self.register_read_burst(register, &mut buffer).await?;

        Ok(u16::from_le_bytes(buffer))
    }

    /// Reads `buffer.len()` registers starting at `register`, relying on the
    /// device's address auto-increment.
    pub async fn register_read_burst(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.bus
            .write_read(self.addr, &[register], buffer)
            .await
            .map_err(|e| e.kind().into())
    }

    pub async fn register_write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.bus.write(self.addr, &[register, value]).await.map_err(|e| e.kind().into())
    }
}

/// One full-duplex transaction of three bytes, chip select held for its duration.
pub async fn transfer_full_duplex<SPI: SpiDevice>(spi: &mut SPI, request: [u8; 3]) -> Result<[u8; 3], BusError> {
    let mut response = [0u8; 3];
    spi.transfer(&mut response, &request).await.map_err(|e| BusError::from(e.kind()))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal_1::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    const ADDR: u8 = 0x77;

    #[test]
    fn test_register_read16_is_little_endian() {
        let expectations = [I2cTransaction::write_read(ADDR, vec![0x88], vec![0x70, 0x6b])];
        let mut dev = RegisterDevice::new(ADDR, I2cMock::new(&expectations));

        let value = block_on(dev.register_read16_le(0x88)).unwrap();
        assert_eq!(value, 0x6b70);

        dev.release().done();
    }

    #[test]
    fn test_register_write_sends_register_then_value() {
        let expectations = [I2cTransaction::write(ADDR, vec![0xf4, 0x3f])];
        let mut dev = RegisterDevice::new(ADDR, I2cMock::new(&expectations));

        block_on(dev.register_write(0xf4, 0x3f)).unwrap();

        dev.release().done();
    }

    #[test]
    fn test_nack_maps_to_device_absent() {
        let expectations = [I2cTransaction::write_read(ADDR, vec![0xd0], vec![0x00])
            .with_error(ErrorKind::NoAcknowledge(embedded_hal_1::i2c::NoAcknowledgeSource::Address))];
        let mut dev = RegisterDevice::new(ADDR, I2cMock::new(&expectations));

        assert_eq!(block_on(dev.register_read(0xd0)), Err(BusError::DeviceAbsent));

        dev.release().done();
    }

    #[test]
    fn test_full_duplex_transfer_returns_response() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer(vec![1, 0x80, 0], vec![0xff, 0x03, 0xff]),
            SpiTransaction::transaction_end(),
        ];
        let mut spi = SpiMock::new(&expectations);

        let response = block_on(transfer_full_duplex(&mut spi, [1, 0x80, 0])).unwrap();
        assert_eq!(response, [0xff, 0x03, 0xff]);

        spi.done();
    }
}
