//! Error types for the control path
//!
//! Nothing in this taxonomy is fatal to the process. Each variant maps to a
//! defined recovery in the control loop:
//!
//! - `StaleReading`: out-of-order telemetry, ignored and logged at debug
//! - `InvalidValue`: non-finite sensor value, dropped before it reaches the
//!   store
//! - `InvalidCommand`: operator input that is neither OPEN nor CLOSE,
//!   surfaced to the caller and never forwarded to the actuator
//! - `InsufficientData`: the risk detector's windows have not filled yet,
//!   reported as no-risk by the caller
//!
//! Transport failures live in `valveguard-connectors`, next to the
//! transports that raise them.

use crate::reading::SensorKind;
use crate::time::Timestamp;
use thiserror::Error;

/// Result type for control operations
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised by the pure control logic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Reading is older than the one already stored for the same sensor
    #[error("stale {kind} reading: observed at {incoming} ms, store holds {current} ms")]
    StaleReading {
        /// Sensor the reading belongs to
        kind: SensorKind,
        /// Timestamp of the rejected reading
        incoming: Timestamp,
        /// Timestamp currently held by the store
        current: Timestamp,
    },

    /// Sensor value is NaN or infinite
    #[error("{kind} value is not a finite number")]
    InvalidValue {
        /// Sensor the reading belongs to
        kind: SensorKind,
    },

    /// Manual command that is neither OPEN nor CLOSE
    #[error("invalid valve command {0:?}: must be OPEN or CLOSE")]
    InvalidCommand(String),

    /// Not enough paired samples for a correlation verdict
    #[error("insufficient paired samples: need {required}, have {available}")]
    InsufficientData {
        /// Minimum number of aligned pairs the detector requires
        required: usize,
        /// Pairs currently available in the overlapping window
        available: usize,
    },
}
