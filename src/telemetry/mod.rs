//! Published plant state and the quantities derived from it.

/// One value of the snapshot together with how current it is.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field<T> {
    /// Read during the cycle that produced the snapshot
    Fresh(T),
    /// Last good value, the read of this cycle failed
    Stale(T),
    #[default]
    Unavailable,
}

impl<T: Copy> Field<T> {
    /// Next value of this field given the outcome of the current read.
    pub fn refresh(self, reading: Option<T>) -> Self {
        match reading {
            Some(value) => Field::Fresh(value),
            None => self.stale(),
        }
    }

    pub fn stale(self) -> Self {
        match self {
            Field::Fresh(value) | Field::Stale(value) => Field::Stale(value),
            Field::Unavailable => Field::Unavailable,
        }
    }

    pub fn value(&self) -> Option<T> {
        match self {
            Field::Fresh(value) | Field::Stale(value) => Some(*value),
            Field::Unavailable => None,
        }
    }

    pub fn fresh(&self) -> Option<T> {
        match self {
            Field::Fresh(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Field::Fresh(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlantTelemetrySnapshot {
    /// Polling cycle that assembled this snapshot, 0 for the one published at init
    pub cycle: u32,
    /// Soil probes in channel order
    pub moisture: [Field<u16>; 3],
    pub light: Field<u16>,
    pub temperature_c: Field<f32>,
    pub humidity_pct: Field<f32>,
    pub pressure_pa: Field<f32>,
    pub altitude_m: Field<f32>,
    pub dew_point_c: Field<f32>,
    pub heat_index_c: Field<f32>,
    /// Grow light relay levels in `GrowLight` order
    pub lights: [Field<bool>; 3],
}

impl PlantTelemetrySnapshot {
    pub const fn empty() -> Self {
        Self {
            cycle: 0,
            moisture: [Field::Unavailable; 3],
            light: Field::Unavailable,
            temperature_c: Field::Unavailable,
            humidity_pct: Field::Unavailable,
            pressure_pa: Field::Unavailable,
            altitude_m: Field::Unavailable,
            dew_point_c: Field::Unavailable,
            heat_index_c: Field::Unavailable,
            lights: [Field::Unavailable; 3],
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Magnus approximation. `None` for a relative humidity of zero or less,
/// where the logarithm is undefined.
pub fn dew_point(temperature_c: f32, humidity_pct: f32) -> Option<f32> {
    const A: f32 = 17.27;
    const B: f32 = 237.7;

    if humidity_pct <= 0.0 {
        return None;
    }

    let alpha = (A * temperature_c) / (B + temperature_c) + libm::logf(humidity_pct / 100.0);

    Some((B * alpha) / (A - alpha))
}

/// Rothfusz regression. Below 80 °F the regression does not apply and the
/// air temperature is returned unchanged.
pub fn heat_index(temperature_c: f32, humidity_pct: f32) -> f32 {
    let t = celsius_to_fahrenheit(temperature_c);
    if t < 80.0 {
        return temperature_c;
    }

    let h = humidity_pct;
    let hi = -42.379 + 2.04901523 * t + 10.14333127 * h
        - 0.22475541 * t * h
        - 0.00683783 * t * t
        - 0.05481717 * h * h
        + 0.00122874 * t * t * h
        + 0.00085282 * t * h * h
        - 0.00000199 * t * t * h * h;

    fahrenheit_to_celsius(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_marks_failed_reads_stale() {
        let field = Field::Unavailable.refresh(Some(512u16));
        assert_eq!(field, Field::Fresh(512));

        let field = field.refresh(None);
        assert_eq!(field, Field::Stale(512));
        assert!(!field.is_fresh());
        assert_eq!(field.value(), Some(512));
        assert_eq!(field.fresh(), None);

        // still the last good value after a second failure
        assert_eq!(field.refresh(None), Field::Stale(512));
    }

    #[test]
    fn test_never_read_stays_unavailable() {
        let field: Field<f32> = Field::Unavailable;

        assert_eq!(field.refresh(None), Field::Unavailable);
        assert_eq!(field.value(), None);
    }

    #[test]
    fn test_empty_snapshot_has_no_values() {
        let snapshot = PlantTelemetrySnapshot::empty();

        assert_eq!(snapshot, PlantTelemetrySnapshot::default());
        assert!(snapshot.moisture.iter().all(|m| m.value().is_none()));
        assert_eq!(snapshot.lights, [Field::Unavailable; 3]);
    }

    #[test]
    fn test_dew_point_at_saturation_equals_temperature() {
        let dp = dew_point(20.0, 100.0).unwrap();

        assert!((dp - 20.0).abs() < 0.01, "{dp}");
    }

    #[test]
    fn test_dew_point_below_temperature() {
        let dp = dew_point(25.08, 55.0).unwrap();

        assert!(dp < 25.08);
        assert!((dp - 15.4).abs() < 0.5, "{dp}");
    }

    #[test]
    fn test_dew_point_undefined_for_dry_air() {
        assert_eq!(dew_point(20.0, 0.0), None);
    }

    #[test]
    fn test_heat_index_below_threshold_is_air_temperature() {
        assert_eq!(heat_index(25.0, 80.0), 25.0);
    }

    #[test]
    fn test_heat_index_hot_humid_air_feels_hotter() {
        // 90 °F at 70 %RH reads about 106 °F on the NWS table
        let hi = heat_index(fahrenheit_to_celsius(90.0), 70.0);

        assert!((celsius_to_fahrenheit(hi) - 105.9).abs() < 1.0, "{hi}");
    }
}
