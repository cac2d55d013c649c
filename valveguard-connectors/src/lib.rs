//! Transport adapters for Valveguard
//!
//! ## Overview
//!
//! This crate owns every network edge of the controller, so the control
//! logic in `valveguard-core` never touches I/O:
//!
//! - [`mqtt`] — the telemetry channel: subscribes to the two inbound sensor
//!   topics, forwards decoded readings to the control loop, and publishes
//!   actuator commands at QoS 1 (at-least-once).
//! - [`registry`] — best-effort heartbeat client for the external service
//!   registry. Failures never block control decisions.
//! - [`alerts`] — fire-and-forget delivery of alert events to human
//!   notification relays. Failures are logged, never retried here.
//! - [`messages`] — the JSON wire formats shared by all of the above.
//!
//! ## Failure model
//!
//! Transport failures are ordinary values, not process-enders:
//!
//! - While the broker is unreachable, inbound readings are simply not
//!   received (no buffering) and outbound publishes fail fast with
//!   [`TransportError::NotConnected`]. The caller's policy is idempotent,
//!   so the next evaluation cycle that produces the same verdict retries
//!   naturally.
//! - Malformed inbound payloads are dropped with a warning; they never
//!   crash the subscriber loop.
//! - Reconnection uses a fixed retry delay and runs forever, which also
//!   covers a broker that is down at startup.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod alerts;
pub mod messages;
pub mod mqtt;
pub mod registry;

// Re-export common types
pub use alerts::{AlertSink, HttpAlertSink};
pub use messages::{ActuatorCommand, AlertEvent, ReadingPayload, ServiceRecord};
pub use mqtt::{MqttConfig, MqttTelemetry};
pub use registry::{RegistryClient, RegistryError};

use thiserror::Error;

/// Errors raised by the telemetry channel
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport is not connected; publishes fail fast
    #[error("transport not connected")]
    NotConnected,

    /// The publish did not complete within its timeout
    #[error("publish timed out")]
    Timeout,

    /// Outbound message could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The underlying MQTT client reported an error
    #[error("mqtt client error: {0}")]
    Client(String),

    /// Inbound payload could not be decoded; the message is dropped
    #[error("malformed payload on {topic}: {reason}")]
    MalformedPayload {
        /// Topic the message arrived on
        topic: String,
        /// Why decoding failed
        reason: String,
    },
}

/// Connection statistics for the telemetry channel
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total commands published successfully
    pub messages_sent: u64,
    /// Total publishes that failed
    pub messages_failed: u64,
    /// Total bytes published
    pub bytes_sent: u64,
    /// Number of (re)connections to the broker
    pub reconnections: u32,
    /// Last transport error message
    pub last_error: Option<String>,
}

/// Sink for actuator commands
///
/// The actuation publisher is generic over this trait so the skip-if-equal
/// and forced-republish policy can be tested against a recording mock
/// without a broker.
#[async_trait::async_trait]
pub trait CommandSink: Send + Sync {
    /// Publish a command to the actuator topic
    ///
    /// Resolves once the transport layer acknowledges the publish; the
    /// remote device's own confirmation is out of scope.
    async fn publish_command(&self, command: &ActuatorCommand) -> Result<(), TransportError>;

    /// Whether the transport is currently connected
    fn is_connected(&self) -> bool;
}
