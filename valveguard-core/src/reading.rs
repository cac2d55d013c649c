//! Sensor readings and sensor kinds
//!
//! A reading is immutable once constructed; later readings of the same kind
//! supersede it in the store, they never mutate it.

use crate::errors::{ControlError, ControlResult};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two physical quantities the controller monitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Process temperature
    Temperature,
    /// Process pressure
    Pressure,
}

impl SensorKind {
    /// Human-readable name, also used in topic names and log lines
    pub const fn name(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Pressure => "pressure",
        }
    }

    /// Unit of measurement
    pub const fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Pressure => "hPa",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Single timestamped sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    /// Which sensor produced the value
    pub kind: SensorKind,
    /// Measured value in the sensor's unit
    pub value: f64,
    /// When the value was observed, milliseconds since epoch
    pub observed_at: Timestamp,
}

impl SensorReading {
    /// Construct a reading, rejecting NaN and infinite values
    pub fn new(kind: SensorKind, value: f64, observed_at: Timestamp) -> ControlResult<Self> {
        if !value.is_finite() {
            return Err(ControlError::InvalidValue { kind });
        }

        Ok(Self {
            kind,
            value,
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_construction() {
        let reading = SensorReading::new(SensorKind::Temperature, 22.5, 1000).unwrap();
        assert_eq!(reading.kind, SensorKind::Temperature);
        assert_eq!(reading.value, 22.5);
        assert_eq!(reading.observed_at, 1000);
    }

    #[test]
    fn non_finite_values_rejected() {
        assert!(SensorReading::new(SensorKind::Pressure, f64::NAN, 0).is_err());
        assert!(SensorReading::new(SensorKind::Pressure, f64::INFINITY, 0).is_err());
        assert!(SensorReading::new(SensorKind::Pressure, f64::NEG_INFINITY, 0).is_err());
    }

    #[test]
    fn kind_names() {
        assert_eq!(SensorKind::Temperature.name(), "temperature");
        assert_eq!(SensorKind::Pressure.name(), "pressure");
        assert_eq!(SensorKind::Pressure.unit(), "hPa");
    }
}
