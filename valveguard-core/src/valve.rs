//! Valve position and actuation state
//!
//! `ValveState` tracks the last commanded position, not the device's
//! confirmed position: it is mutated only by the actuation publisher and
//! only after the transport acknowledges a publish, which decouples
//! "decided" from "confirmed sent".

use crate::decision::Verdict;
use crate::errors::{ControlError, ControlResult};
use crate::time::Timestamp;
use serde::Serialize;
use std::fmt;

/// Commanded valve position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValvePosition {
    /// Relief valve open
    Open,
    /// Relief valve closed
    Closed,
}

impl ValvePosition {
    /// Wire command word for the actuator topic
    pub const fn as_command(&self) -> &'static str {
        match self {
            ValvePosition::Open => "OPEN",
            ValvePosition::Closed => "CLOSE",
        }
    }

    /// Parse an operator command, case-insensitively
    ///
    /// Anything but OPEN or CLOSE is an `InvalidCommand` and must never
    /// reach the actuation publisher.
    pub fn from_command(raw: &str) -> ControlResult<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(ValvePosition::Open),
            "CLOSE" => Ok(ValvePosition::Closed),
            _ => Err(ControlError::InvalidCommand(raw.to_string())),
        }
    }
}

impl fmt::Display for ValvePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_command())
    }
}

impl Verdict {
    /// Position this verdict drives toward, if any
    pub const fn target_position(&self) -> Option<ValvePosition> {
        match self {
            Verdict::Open => Some(ValvePosition::Open),
            Verdict::Close => Some(ValvePosition::Closed),
            Verdict::NoAction => None,
        }
    }
}

/// What caused an actuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Threshold decision engine
    Automatic,
    /// Operator command
    Manual,
    /// Cascading-risk override
    CascadeOverride,
}

impl Trigger {
    /// Manual and override actuations always publish, even when the
    /// commanded position already matches the stored state.
    pub const fn forces_publish(&self) -> bool {
        !matches!(self, Trigger::Automatic)
    }
}

/// Last commanded valve state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValveState {
    /// Last position acknowledged by the transport
    pub position: ValvePosition,
    /// When the state last changed, milliseconds since epoch
    pub changed_at: Timestamp,
    /// What caused the last change
    pub trigger: Trigger,
}

impl ValveState {
    /// Initial state at process startup
    pub fn new(position: ValvePosition, at: Timestamp) -> Self {
        Self {
            position,
            changed_at: at,
            trigger: Trigger::Automatic,
        }
    }
}
