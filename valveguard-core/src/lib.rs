//! Core control logic for Valveguard
//!
//! Decides whether a relief valve must be opened or closed from live
//! temperature and pressure telemetry, and detects developing cascading
//! failures before either sensor crosses its hard limit.
//!
//! Everything in this crate is pure, synchronous state machinery:
//! - No I/O and no async - transports live in `valveguard-connectors`
//! - Decisions are explicit values (`Verdict`, `RiskAssessment`) so the
//!   decision engine and the risk detector stay independently testable
//! - The only mutable state is the reading store, the valve state and the
//!   detector's rolling windows, each owned by exactly one caller
//!
//! ```no_run
//! use valveguard_core::{decide, ReadingStore, SensorKind, SensorReading, ThresholdConfig};
//!
//! let mut store = ReadingStore::new();
//! let reading = SensorReading::new(SensorKind::Pressure, 160.0, 1000)?;
//! store.update(reading)?;
//!
//! let verdict = decide(&store.snapshot(), &ThresholdConfig::default());
//! # Ok::<(), valveguard_core::ControlError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cascade;
pub mod decision;
pub mod errors;
pub mod reading;
pub mod store;
pub mod thresholds;
pub mod time;
pub mod valve;
pub mod window;

// Public API
pub use cascade::{CascadeConfig, CascadeDetector, RiskAssessment};
pub use decision::{decide, Verdict};
pub use errors::{ControlError, ControlResult};
pub use reading::{SensorKind, SensorReading};
pub use store::{ReadingStore, Snapshot};
pub use thresholds::ThresholdConfig;
pub use time::{FixedClock, SystemClock, TimeSource, Timestamp};
pub use valve::{Trigger, ValvePosition, ValveState};

/// Crate version, exposed for registry heartbeats and status reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
