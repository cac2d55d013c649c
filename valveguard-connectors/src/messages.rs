//! JSON wire formats
//!
//! Every payload that crosses a network edge is defined here, in the shapes
//! the surrounding collaborators already speak:
//!
//! - inbound sensor readings: `{"value": 23.5, "timestamp": "..."}` with an
//!   optional ISO-8601 timestamp defaulting to receipt time
//! - outbound actuator commands: `{"command", "reason", "automatic"}`
//! - alert events for the notification relays
//! - the service record posted to the registry

use crate::TransportError;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use valveguard_core::{SensorKind, SensorReading, Timestamp, Trigger, ValvePosition};

/// Inbound telemetry payload as published by the sensor node
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingPayload {
    /// Measured value
    pub value: f64,
    /// Observation time, ISO-8601; receipt time is used when absent
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Decode an inbound telemetry message into a sensor reading
///
/// `received_at` is the local receipt timestamp, used when the payload
/// carries no timestamp of its own. Any defect (invalid JSON, non-numeric
/// value, unparseable timestamp) is a `MalformedPayload`: the caller drops
/// the message and logs, nothing more.
pub fn decode_reading(
    kind: SensorKind,
    topic: &str,
    payload: &[u8],
    received_at: Timestamp,
) -> Result<SensorReading, TransportError> {
    let malformed = |reason: String| TransportError::MalformedPayload {
        topic: topic.to_string(),
        reason,
    };

    let parsed: ReadingPayload =
        serde_json::from_slice(payload).map_err(|e| malformed(e.to_string()))?;

    let observed_at = match parsed.timestamp.as_deref() {
        Some(text) => parse_iso8601(text)
            .ok_or_else(|| malformed(format!("unparseable timestamp {text:?}")))?,
        None => received_at,
    };

    SensorReading::new(kind, parsed.value, observed_at)
        .map_err(|e| malformed(e.to_string()))
}

/// Outbound actuator command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// `OPEN` or `CLOSE`
    pub command: String,
    /// Human-readable cause, for the audit trail downstream
    pub reason: String,
    /// False for manual operator commands
    pub automatic: bool,
}

impl ActuatorCommand {
    /// Build a command for a position change caused by `trigger`
    ///
    /// Cascade overrides count as automatic: `automatic` is false only for
    /// operator-issued commands.
    pub fn new(position: ValvePosition, trigger: Trigger, reason: impl Into<String>) -> Self {
        Self {
            command: position.as_command().to_string(),
            reason: reason.into(),
            automatic: trigger != Trigger::Manual,
        }
    }
}

/// Alert event for the notification relays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Alert category, e.g. `critical_values` or `cascading_risk`
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// ISO-8601 emission time
    pub timestamp: String,
    /// Structured context, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl AlertEvent {
    /// Build an alert emitted at `at` (milliseconds since epoch)
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        at: Timestamp,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            timestamp: format_iso8601(at),
            data,
        }
    }
}

/// Service identity posted to the external registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Stable service id
    pub id: String,
    /// Display name
    pub name: String,
    /// Reachable endpoint URL
    pub endpoint: String,
    /// Listening port
    pub port: u16,
}

/// Parse an ISO-8601 timestamp into epoch milliseconds
///
/// Accepts both offset-carrying RFC 3339 and the naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` form (interpreted as UTC) that the
/// sensor node emits.
pub fn parse_iso8601(text: &str) -> Option<Timestamp> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return u64::try_from(with_offset.timestamp_millis()).ok();
    }

    let naive: NaiveDateTime = text.parse().ok()?;
    u64::try_from(naive.and_utc().timestamp_millis()).ok()
}

/// Format epoch milliseconds as an RFC 3339 timestamp in UTC
pub fn format_iso8601(at: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(at as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
