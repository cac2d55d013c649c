//! Latest-reading store
//!
//! Holds at most one reading per sensor kind. The store itself is a plain
//! struct: serializing concurrent delivery callbacks against decision
//! evaluation is the owner's job (the service wraps it in a single mutex),
//! which keeps `update`/`snapshot` trivially testable.
//!
//! Out-of-order readings are rejected, not merged: a reading whose
//! `observed_at` is strictly earlier than the stored one for the same kind
//! is a `StaleReading` no-op. Equal timestamps supersede, so a repeated
//! publish of the latest value is accepted.

use crate::errors::{ControlError, ControlResult};
use crate::reading::{SensorKind, SensorReading};

/// Atomic copy of both latest readings
///
/// Taken under the store's lock so the decision engine never sees a torn
/// pair (a temperature from one reading and a pressure mid-update).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    /// Latest temperature reading, if any has been observed
    pub temperature: Option<SensorReading>,
    /// Latest pressure reading, if any has been observed
    pub pressure: Option<SensorReading>,
}

impl Snapshot {
    /// Latest reading for a kind
    pub fn get(&self, kind: SensorKind) -> Option<SensorReading> {
        match kind {
            SensorKind::Temperature => self.temperature,
            SensorKind::Pressure => self.pressure,
        }
    }

    /// True once both sensors have been observed at least once
    pub fn is_complete(&self) -> bool {
        self.temperature.is_some() && self.pressure.is_some()
    }
}

/// Store of the single latest reading per sensor kind
#[derive(Debug, Default)]
pub struct ReadingStore {
    temperature: Option<SensorReading>,
    pressure: Option<SensorReading>,
}

impl ReadingStore {
    /// Create an empty store; both sensors start unobserved
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a reading, superseding the stored one of the same kind
    ///
    /// Rejects the reading with `StaleReading` if the stored entry has a
    /// strictly later `observed_at`. The store is left unchanged on error.
    pub fn update(&mut self, reading: SensorReading) -> ControlResult<()> {
        let slot = match reading.kind {
            SensorKind::Temperature => &mut self.temperature,
            SensorKind::Pressure => &mut self.pressure,
        };

        if let Some(current) = slot {
            if current.observed_at > reading.observed_at {
                return Err(ControlError::StaleReading {
                    kind: reading.kind,
                    incoming: reading.observed_at,
                    current: current.observed_at,
                });
            }
        }

        *slot = Some(reading);
        Ok(())
    }

    /// Immutable copy of both latest readings
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            temperature: self.temperature,
            pressure: self.pressure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(value: f64, at: u64) -> SensorReading {
        SensorReading::new(SensorKind::Temperature, value, at).unwrap()
    }

    fn pressure(value: f64, at: u64) -> SensorReading {
        SensorReading::new(SensorKind::Pressure, value, at).unwrap()
    }

    #[test]
    fn empty_store_snapshot() {
        let store = ReadingStore::new();
        let snap = store.snapshot();
        assert!(snap.temperature.is_none());
        assert!(snap.pressure.is_none());
        assert!(!snap.is_complete());
    }

    #[test]
    fn latest_reading_supersedes() {
        let mut store = ReadingStore::new();
        store.update(temp(20.0, 1000)).unwrap();
        store.update(temp(21.0, 2000)).unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.temperature.unwrap().value, 21.0);
        assert_eq!(snap.temperature.unwrap().observed_at, 2000);
    }

    #[test]
    fn stale_reading_rejected_store_unchanged() {
        let mut store = ReadingStore::new();
        store.update(temp(20.0, 2000)).unwrap();

        let err = store.update(temp(99.0, 1000)).unwrap_err();
        assert_eq!(
            err,
            ControlError::StaleReading {
                kind: SensorKind::Temperature,
                incoming: 1000,
                current: 2000,
            }
        );

        // Rejection must not alter the store
        assert_eq!(store.snapshot().temperature.unwrap().value, 20.0);
    }

    #[test]
    fn equal_timestamp_supersedes() {
        let mut store = ReadingStore::new();
        store.update(temp(20.0, 1000)).unwrap();
        store.update(temp(20.5, 1000)).unwrap();
        assert_eq!(store.snapshot().temperature.unwrap().value, 20.5);
    }

    #[test]
    fn kinds_are_independent() {
        let mut store = ReadingStore::new();
        store.update(temp(20.0, 5000)).unwrap();

        // An older pressure reading is fine; staleness is per kind
        store.update(pressure(101.0, 1000)).unwrap();

        let snap = store.snapshot();
        assert!(snap.is_complete());
        assert_eq!(snap.get(SensorKind::Pressure).unwrap().value, 101.0);
    }
}
