//! Datasheet compensation formulas.
//!
//! Operation order and intermediate widths follow the reference code exactly,
//! the results are bit-exact with it. Integer paths use wrapping arithmetic
//! so that out-of-range coefficients produce garbage values instead of a panic.

use super::calibration::CalibrationCoefficients;

/// Upper clamp of the humidity accumulator, 100 %RH in Q22.10 before `>> 12`.
pub const HUMIDITY_MAX_Q: i32 = 419_430_400;

/// Q22.10 scale of the humidity output.
pub const HUMIDITY_DIVISOR: f32 = 1024.0;

/// Q24.8 scale of the pressure output.
pub const PRESSURE_DIVISOR: f32 = 256.0;

/// Temperature intermediate shared by the pressure and humidity formulas.
///
/// Only [`compensate_temperature`] creates one, and it is passed by value into
/// the other formulas of the same sampling pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FineTemperature(i32);

impl FineTemperature {
    pub fn value(self) -> i32 {
        self.0
    }
}

/// 20 bit ADC code from the MSB, LSB and XLSB[7:4] registers.
pub fn raw_sample(msb: u8, lsb: u8, xlsb: u8) -> u32 {
    (u32::from(msb) << 12) | (u32::from(lsb) << 4) | (u32::from(xlsb) >> 4)
}

/// Returns °C and the fine temperature for the rest of the pass.
pub fn compensate_temperature(calib: &CalibrationCoefficients, raw: u32) -> (f64, FineTemperature) {
    let raw = f64::from(raw);
    let t1 = f64::from(calib.t1);
    let t2 = f64::from(calib.t2);
    let t3 = f64::from(calib.t3);

    let var1 = (raw / 16384.0 - t1 / 1024.0) * t2;
    let var2 = (raw / 131072.0 - t1 / 8192.0) * (raw / 131072.0 - t1 / 8192.0) * t3;
    let fine = libm::floor(var1 + var2) as i32;

    ((var1 + var2) / 5120.0, FineTemperature(fine))
}

/// Pressure in Pa as Q24.8, 0 when the formula would divide by zero.
pub fn compensate_pressure(calib: &CalibrationCoefficients, raw: u32, fine: FineTemperature) -> u32 {
    let p1 = i64::from(calib.p1);
    let p2 = i64::from(calib.p2);
    let p3 = i64::from(calib.p3);
    let p4 = i64::from(calib.p4);
    let p5 = i64::from(calib.p5);
    let p6 = i64::from(calib.p6);
    let p7 = i64::from(calib.p7);
    let p8 = i64::from(calib.p8);
    let p9 = i64::from(calib.p9);

    let mut var1 = i64::from(fine.0) - 128000;
    let mut var2 = var1.wrapping_mul(var1).wrapping_mul(p6);
    var2 = var2.wrapping_add(var1.wrapping_mul(p5) << 17);
    var2 = var2.wrapping_add(p4 << 35);
    var1 = (var1.wrapping_mul(var1).wrapping_mul(p3) >> 8).wrapping_add(var1.wrapping_mul(p2) << 12);
    var1 = ((1i64 << 47).wrapping_add(var1)).wrapping_mul(p1) >> 33;
    if var1 == 0 {
        return 0;
    }

    let mut p: i64 = 1048576 - i64::from(raw);
    p = ((p << 31).wrapping_sub(var2)).wrapping_mul(3125).wrapping_div(var1);
    var1 = p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
    var2 = p8.wrapping_mul(p) >> 19;
    p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(p7 << 4);

    p as u32
}

/// Relative humidity in %RH as Q22.10.
pub fn compensate_humidity(calib: &CalibrationCoefficients, raw: u16, fine: FineTemperature) -> u32 {
    let raw = i32::from(raw);
    let h1 = i32::from(calib.h1);
    let h2 = i32::from(calib.h2);
    let h3 = i32::from(calib.h3);
    let h4 = i32::from(calib.h4);
    let h5 = i32::from(calib.h5);
    let h6 = i32::from(calib.h6);

    let mut v = fine.0.wrapping_sub(76800);
    let x1 = (raw << 14).wrapping_sub(h4 << 20).wrapping_sub(h5.wrapping_mul(v)).wrapping_add(16384) >> 15;
    let x2 = (v.wrapping_mul(h6) >> 10).wrapping_mul((v.wrapping_mul(h3) >> 11).wrapping_add(32768)) >> 10;
    let x3 = x2.wrapping_add(2097152).wrapping_mul(h2).wrapping_add(8192) >> 14;
    v = x1.wrapping_mul(x3);
    v = v.wrapping_sub((((v >> 15).wrapping_mul(v >> 15) >> 7).wrapping_mul(h1)) >> 4);
    v = v.clamp(0, HUMIDITY_MAX_Q);

    (v >> 12) as u32
}

/// International barometric formula, both pressures in hPa.
pub fn altitude(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44330.0 * (1.0 - libm::powf(pressure_hpa / sea_level_hpa, 0.1903))
}
