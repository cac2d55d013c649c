//! Actuation thresholds
//!
//! Loaded once at startup and immutable for the process lifetime. The
//! min/max pair per sensor creates the dead-band the decision engine relies
//! on; the critical checks feed the alert path, not the actuation path.

use serde::{Deserialize, Serialize};

/// Min/max actuation thresholds for both sensors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Pressure below which a close becomes possible
    pub pressure_min: f64,
    /// Pressure above which the valve must open
    pub pressure_max: f64,
    /// Temperature below which a close becomes possible
    pub temperature_min: f64,
    /// Temperature above which the valve must open
    pub temperature_max: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            pressure_min: 30.0,
            pressure_max: 150.0,
            temperature_min: 10.0,
            temperature_max: 80.0,
        }
    }
}

impl ThresholdConfig {
    /// Create a config, swapping any min/max pair given in the wrong order
    pub fn new(
        pressure_min: f64,
        pressure_max: f64,
        temperature_min: f64,
        temperature_max: f64,
    ) -> Self {
        let (pressure_min, pressure_max) = ordered(pressure_min, pressure_max);
        let (temperature_min, temperature_max) = ordered(temperature_min, temperature_max);

        Self {
            pressure_min,
            pressure_max,
            temperature_min,
            temperature_max,
        }
    }

    /// Pressure outside the [min, max] band
    pub fn is_pressure_critical(&self, pressure: f64) -> bool {
        pressure < self.pressure_min || pressure > self.pressure_max
    }

    /// Temperature outside the [min, max] band
    pub fn is_temperature_critical(&self, temperature: f64) -> bool {
        temperature < self.temperature_min || temperature > self.temperature_max
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ThresholdConfig::default();
        assert_eq!(config.pressure_min, 30.0);
        assert_eq!(config.pressure_max, 150.0);
        assert_eq!(config.temperature_min, 10.0);
        assert_eq!(config.temperature_max, 80.0);
    }

    #[test]
    fn swapped_bounds_are_reordered() {
        let config = ThresholdConfig::new(150.0, 30.0, 80.0, 10.0);
        assert_eq!(config.pressure_min, 30.0);
        assert_eq!(config.pressure_max, 150.0);
        assert_eq!(config.temperature_min, 10.0);
        assert_eq!(config.temperature_max, 80.0);
    }

    #[test]
    fn critical_checks() {
        let config = ThresholdConfig::default();

        assert!(config.is_pressure_critical(20.0));
        assert!(config.is_pressure_critical(160.0));
        assert!(!config.is_pressure_critical(100.0));

        assert!(config.is_temperature_critical(5.0));
        assert!(config.is_temperature_critical(85.0));
        assert!(!config.is_temperature_critical(50.0));
    }
}
