use embedded_hal_async::i2c::I2c;

use crate::bus::RegisterDevice;
use crate::error::BusError;

const REG_DIG_T1: u8 = 0x88;
const REG_DIG_T2: u8 = 0x8a;
const REG_DIG_T3: u8 = 0x8c;
const REG_DIG_P1: u8 = 0x8e;
const REG_DIG_P2: u8 = 0x90;
const REG_DIG_P3: u8 = 0x92;
const REG_DIG_P4: u8 = 0x94;
const REG_DIG_P5: u8 = 0x96;
const REG_DIG_P6: u8 = 0x98;
const REG_DIG_P7: u8 = 0x9a;
const REG_DIG_P8: u8 = 0x9c;
const REG_DIG_P9: u8 = 0x9e;
const REG_DIG_H1: u8 = 0xa1;
const REG_DIG_H2: u8 = 0xe1;
const REG_DIG_H3: u8 = 0xe3;
const REG_DIG_H4: u8 = 0xe4;
const REG_DIG_H45: u8 = 0xe5;
const REG_DIG_H5: u8 = 0xe6;
const REG_DIG_H6: u8 = 0xe7;

/// Factory trimming parameters, read once per device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationCoefficients {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,

    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,

    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl CalibrationCoefficients {
    pub async fn read<I2C: I2c>(dev: &mut RegisterDevice<I2C>) -> Result<Self, BusError> {
        let t1 = dev.register_read16_le(REG_DIG_T1).await?;
        let t2 = dev.register_read16_le(REG_DIG_T2).await? as i16;
        let t3 = dev.register_read16_le(REG_DIG_T3).await? as i16;

        let p1 = dev.register_read16_le(REG_DIG_P1).await?;
        let p2 = dev.register_read16_le(REG_DIG_P2).await? as i16;
        let p3 = dev.register_read16_le(REG_DIG_P3).await? as i16;
        let p4 = dev.register_read16_le(REG_DIG_P4).await? as i16;
        let p5 = dev.register_read16_le(REG_DIG_P5).await? as i16;
        let p6 = dev.register_read16_le(REG_DIG_P6).await? as i16;
        let p7 = dev.register_read16_le(REG_DIG_P7).await? as i16;
        let p8 = dev.register_read16_le(REG_DIG_P8).await? as i16;
        let p9 = dev.register_read16_le(REG_DIG_P9).await? as i16;

        let h1 = dev.register_read(REG_DIG_H1).await?;
        let h2 = dev.register_read16_le(REG_DIG_H2).await? as i16;
        let h3 = dev.register_read(REG_DIG_H3).await?;
        let e4 = dev.register_read(REG_DIG_H4).await?;
        let e5 = dev.register_read(REG_DIG_H45).await?;
        let e6 = dev.register_read(REG_DIG_H5).await?;
        let h6 = dev.register_read(REG_DIG_H6).await? as i8;

        // H4 and H5 are 12 bit values sharing the nibbles of 0xE5,
        // the MSB byte carries the sign.
        let h4 = (i16::from(e4 as i8) << 4) | i16::from(e5 & 0x0f);
        let h5 = (i16::from(e6 as i8) << 4) | i16::from(e5 >> 4);

        Ok(Self {
            t1,
            t2,
            t3,
            p1,
            p2,
            p3,
            p4,
            p5,
            p6,
            p7,
            p8,
            p9,
            h1,
            h2,
            h3,
            h4,
            h5,
            h6,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAirSensor;
    use embassy_futures::block_on;

    #[test]
    fn test_read_decodes_signed_words_and_split_nibbles() {
        let mut fake = FakeAirSensor::new();
        fake.set_word(REG_DIG_T1, 27504);
        fake.set_word(REG_DIG_T2, 26435);
        fake.set_word(REG_DIG_T3, (-1000i16) as u16);
        fake.set_word(REG_DIG_P9, (-7i16) as u16);
        fake.regs[REG_DIG_H1 as usize] = 75;
        fake.set_word(REG_DIG_H2, 362);
        fake.regs[REG_DIG_H3 as usize] = 0;
        fake.regs[0xe4] = 0x13;
        fake.regs[0xe5] = 0x29;
        fake.regs[0xe6] = 0x03;
        fake.regs[0xe7] = 0xe2;
        let mut dev = RegisterDevice::new(0x77, fake);

        let calib = block_on(CalibrationCoefficients::read(&mut dev)).unwrap();

        assert_eq!(calib.t1, 27504);
        assert_eq!(calib.t2, 26435);
        assert_eq!(calib.t3, -1000);
        assert_eq!(calib.p9, -7);
        assert_eq!(calib.h1, 75);
        assert_eq!(calib.h2, 362);
        assert_eq!(calib.h4, 0x139);
        assert_eq!(calib.h5, 0x032);
        assert_eq!(calib.h6, -30);
    }

    #[test]
    fn test_negative_h4_is_sign_extended() {
        let mut fake = FakeAirSensor::new();
        fake.regs[0xe4] = 0xff;
        fake.regs[0xe5] = 0x0e;
        let mut dev = RegisterDevice::new(0x77, fake);

        let calib = block_on(CalibrationCoefficients::read(&mut dev)).unwrap();

        assert_eq!(calib.h4, -2);
    }
}
