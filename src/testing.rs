//! Stateful device models for host tests.

use embedded_hal_1::digital::{self, OutputPin, StatefulOutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{self, I2c, NoAcknowledgeSource};
use embedded_hal_async::spi::{self, SpiDevice};

pub struct NoDelay;

impl DelayNs for NoDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// BME280 register file with address auto-increment.
pub struct FakeAirSensor {
    pub regs: [u8; 256],
    pub absent: bool,
    pub fail_writes: bool,
    pub fail_from_register: Option<u8>,
    pointer: u8,
}

impl FakeAirSensor {
    pub fn new() -> Self {
        Self {
            regs: [0; 256],
            absent: false,
            fail_writes: false,
            fail_from_register: None,
            pointer: 0,
        }
    }

    /// Datasheet trimming values, 25.08 °C, 100653 Pa and about 55 %RH.
    pub fn datasheet() -> Self {
        let mut fake = Self::new();
        fake.regs[0xd0] = 0x60;

        let words: [(u8, i32); 12] = [
            (0x88, 27504),
            (0x8a, 26435),
            (0x8c, -1000),
            (0x8e, 36477),
            (0x90, -10685),
            (0x92, 3024),
            (0x94, 2855),
            (0x96, 140),
            (0x98, -7),
            (0x9a, 15500),
            (0x9c, -14600),
            (0x9e, 6000),
        ];
        for (reg, value) in words {
            fake.set_word(reg, value as u16);
        }

        fake.regs[0xa1] = 75;
        fake.set_word(0xe1, 362);
        fake.regs[0xe3] = 0;
        fake.regs[0xe4] = 0x13;
        fake.regs[0xe5] = 0x29;
        fake.regs[0xe6] = 0x03;
        fake.regs[0xe7] = 30;

        fake.set_pressure(415148);
        fake.set_temperature(519888);
        fake.set_humidity(30000);
        fake
    }

    pub fn set_word(&mut self, reg: u8, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs[reg as usize] = lo;
        self.regs[reg as usize + 1] = hi;
    }

    pub fn set_pressure(&mut self, raw: u32) {
        self.set_sample(0xf7, raw);
    }

    pub fn set_temperature(&mut self, raw: u32) {
        self.set_sample(0xfa, raw);
    }

    pub fn set_humidity(&mut self, raw: u16) {
        let [msb, lsb] = raw.to_be_bytes();
        self.regs[0xfd] = msb;
        self.regs[0xfe] = lsb;
    }

    fn set_sample(&mut self, reg: u8, raw: u32) {
        self.regs[reg as usize] = (raw >> 12) as u8;
        self.regs[reg as usize + 1] = (raw >> 4) as u8;
        self.regs[reg as usize + 2] = ((raw & 0x0f) << 4) as u8;
    }
}

impl i2c::ErrorType for FakeAirSensor {
    type Error = i2c::ErrorKind;
}

impl I2c for FakeAirSensor {
    async fn transaction(&mut self, _address: u8, operations: &mut [i2c::Operation<'_>]) -> Result<(), Self::Error> {
        if self.absent {
            return Err(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => {
                    let Some((&reg, values)) = bytes.split_first() else {
                        continue;
                    };
                    self.pointer = reg;
                    if values.is_empty() {
                        continue;
                    }
                    if self.fail_writes {
                        return Err(i2c::ErrorKind::Other);
                    }
                    for (i, value) in values.iter().enumerate() {
                        self.regs[reg.wrapping_add(i as u8) as usize] = *value;
                    }
                }
                i2c::Operation::Read(buffer) => {
                    if self.fail_from_register.is_some_and(|from| self.pointer >= from) {
                        return Err(i2c::ErrorKind::Other);
                    }
                    for (i, byte) in buffer.iter_mut().enumerate() {
                        *byte = self.regs[self.pointer.wrapping_add(i as u8) as usize];
                    }
                }
            }
        }

        Ok(())
    }
}

/// MCP3008 model answering from a table of codes.
pub struct FakeAdc {
    pub codes: [u16; 8],
    pub fail: bool,
    pub failing_channels: [bool; 8],
    /// Every channel answers with the number of channel 0 conversions so far.
    pub ramp: bool,
    conversions: u16,
}

impl FakeAdc {
    pub fn new(codes: [u16; 8]) -> Self {
        Self {
            codes,
            fail: false,
            failing_channels: [false; 8],
            ramp: false,
            conversions: 0,
        }
    }
}

impl spi::ErrorType for FakeAdc {
    type Error = spi::ErrorKind;
}

impl SpiDevice for FakeAdc {
    async fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(spi::ErrorKind::ChipSelectFault);
        }

        for operation in operations {
            if let spi::Operation::Transfer(read, write) = operation {
                let channel = ((write[1] >> 4) & 0x07) as usize;
                if self.failing_channels[channel] {
                    return Err(spi::ErrorKind::Other);
                }
                if channel == 0 {
                    self.conversions = self.conversions.wrapping_add(1);
                }
                let code = if self.ramp { self.conversions & 0x3ff } else { self.codes[channel] };
                read[0] = 0xff;
                read[1] = 0xfc | (code >> 8) as u8;
                read[2] = code as u8;
            }
        }

        Ok(())
    }
}

pub struct FakePin {
    pub high: bool,
    pub broken: bool,
}

impl FakePin {
    pub fn new(high: bool) -> Self {
        Self { high, broken: false }
    }
}

impl digital::ErrorType for FakePin {
    type Error = digital::ErrorKind;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(digital::ErrorKind::Other);
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(digital::ErrorKind::Other);
        }
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for FakePin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        if self.broken {
            return Err(digital::ErrorKind::Other);
        }
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}
