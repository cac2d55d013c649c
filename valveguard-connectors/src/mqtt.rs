//! MQTT telemetry channel
//!
//! ## Overview
//!
//! One MQTT session carries the whole telemetry exchange: two inbound
//! sensor topics and one outbound actuator topic. The adapter splits into
//! two halves:
//!
//! - a background driver task that owns the rumqttc event loop, decodes
//!   inbound publishes and forwards them over a bounded channel, and
//! - the [`MqttTelemetry`] handle, which publishes actuator commands and
//!   exposes connection state.
//!
//! ## Delivery semantics
//!
//! - Inbound and outbound both use QoS 1 (at-least-once). Duplicate
//!   deliveries are harmless: the reading store discards stale readings and
//!   the actuation policy is idempotent.
//! - The delivery path never blocks on network I/O beyond the bounded
//!   channel send; decoding failures drop the message with a warning and
//!   keep the loop alive.
//! - On connection loss the driver sleeps a fixed delay and polls again;
//!   rumqttc re-establishes the session and the ConnAck handler
//!   re-subscribes. The same loop covers a broker that is down at startup.
//!   While disconnected there is no inbound backlog and outbound publishes
//!   fail fast with [`TransportError::NotConnected`].

use crate::messages::{decode_reading, ActuatorCommand};
use crate::{CommandSink, ConnectionStats, TransportError};
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use valveguard_core::{SensorKind, SensorReading, TimeSource};

/// MQTT channel configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker hostname or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Optional username/password pair
    pub credentials: Option<(String, String)>,
    /// Inbound temperature topic
    pub temperature_topic: String,
    /// Inbound pressure topic
    pub pressure_topic: String,
    /// Outbound actuator command topic
    pub actuator_topic: String,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
    /// Fixed delay between reconnection attempts
    pub reconnect_delay: Duration,
    /// Timeout for a single outbound publish
    pub publish_timeout: Duration,
    /// Capacity of the inbound reading channel
    pub channel_capacity: usize,
}

impl MqttConfig {
    /// Configuration with the deployment's default topics and timings
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: "valveguard".to_string(),
            credentials: None,
            temperature_topic: "/sensor/temperature".to_string(),
            pressure_topic: "/sensor/pressure".to_string(),
            actuator_topic: "/actuator/valve".to_string(),
            keep_alive: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(5),
            channel_capacity: 64,
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set username/password authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set the reconnection delay in seconds
    pub fn reconnect_delay_secs(mut self, secs: u64) -> Self {
        self.reconnect_delay = Duration::from_secs(secs);
        self
    }

    /// Set the outbound publish timeout in seconds
    pub fn publish_timeout_secs(mut self, secs: u64) -> Self {
        self.publish_timeout = Duration::from_secs(secs);
        self
    }

    fn kind_for_topic(&self, topic: &str) -> Option<SensorKind> {
        if topic == self.temperature_topic {
            Some(SensorKind::Temperature)
        } else if topic == self.pressure_topic {
            Some(SensorKind::Pressure)
        } else {
            None
        }
    }
}

/// Handle to the MQTT telemetry channel
///
/// Cheap to clone; all clones share the session, the connection flag and
/// the stats.
#[derive(Clone)]
pub struct MqttTelemetry {
    client: AsyncClient,
    config: Arc<MqttConfig>,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
}

impl MqttTelemetry {
    /// Open the channel and spawn its driver task
    ///
    /// Returns the handle, the receiver of decoded inbound readings, and
    /// the driver task's join handle. The connection itself is established
    /// (and re-established) by the driver; a broker that is unreachable at
    /// startup is retried on the configured delay.
    pub fn connect(
        config: MqttConfig,
        clock: Arc<dyn TimeSource + Send + Sync>,
    ) -> (Self, mpsc::Receiver<SensorReading>, JoinHandle<()>) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        if let Some((username, password)) = &config.credentials {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 16);
        let (tx, rx) = mpsc::channel(config.channel_capacity);

        let telemetry = Self {
            client,
            config: Arc::new(config),
            connected: Arc::new(AtomicBool::new(false)),
            stopping: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(ConnectionStats::default())),
        };

        let driver = tokio::spawn(Self::drive(telemetry.clone(), event_loop, tx, clock));
        (telemetry, rx, driver)
    }

    /// Driver loop: polls the event loop until shutdown
    async fn drive(
        this: Self,
        mut event_loop: EventLoop,
        tx: mpsc::Sender<SensorReading>,
        clock: Arc<dyn TimeSource + Send + Sync>,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    this.connected.store(true, Ordering::SeqCst);
                    if let Ok(mut stats) = this.stats.lock() {
                        stats.reconnections += 1;
                    }
                    info!("connected to MQTT broker at {}:{}", this.config.host, this.config.port);
                    this.subscribe_inbound().await;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Some(kind) = this.config.kind_for_topic(&publish.topic) else {
                        debug!("ignoring message on unexpected topic {}", publish.topic);
                        continue;
                    };

                    match decode_reading(kind, &publish.topic, &publish.payload, clock.now()) {
                        Ok(reading) => {
                            debug!(
                                "received {} = {} ({} ms)",
                                reading.kind, reading.value, reading.observed_at
                            );
                            if tx.send(reading).await.is_err() {
                                // Control loop is gone; nothing left to feed
                                info!("reading channel closed, stopping MQTT driver");
                                return;
                            }
                        }
                        Err(e) => warn!("dropping inbound message: {e}"),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if this.stopping.load(Ordering::SeqCst) {
                        debug!("MQTT driver stopping: {e}");
                        return;
                    }

                    if this.connected.swap(false, Ordering::SeqCst) {
                        warn!("lost connection to MQTT broker: {e}");
                    } else {
                        warn!(
                            "MQTT broker unreachable ({e}), retrying in {:?}",
                            this.config.reconnect_delay
                        );
                    }
                    if let Ok(mut stats) = this.stats.lock() {
                        stats.last_error = Some(e.to_string());
                    }
                    tokio::time::sleep(this.config.reconnect_delay).await;
                }
            }
        }
    }

    async fn subscribe_inbound(&self) {
        for topic in [&self.config.temperature_topic, &self.config.pressure_topic] {
            match self.client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                Ok(()) => info!("subscribed to {topic}"),
                Err(e) => error!("failed to subscribe to {topic}: {e}"),
            }
        }
    }

    /// Unsubscribe from both inbound sensor topics
    ///
    /// First step of graceful shutdown; readings stop flowing but the
    /// session stays usable for a final command publish.
    pub async fn unsubscribe_inbound(&self) -> Result<(), TransportError> {
        for topic in [&self.config.temperature_topic, &self.config.pressure_topic] {
            self.client
                .unsubscribe(topic.clone())
                .await
                .map_err(|e| TransportError::Client(e.to_string()))?;
        }
        Ok(())
    }

    /// Disconnect from the broker and let the driver task exit
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.stopping.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.client
            .disconnect()
            .await
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    /// Snapshot of the connection statistics
    pub fn stats(&self) -> ConnectionStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn record_failure(&self, error: &TransportError) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.messages_failed += 1;
            stats.last_error = Some(error.to_string());
        }
    }
}

#[async_trait::async_trait]
impl CommandSink for MqttTelemetry {
    async fn publish_command(&self, command: &ActuatorCommand) -> Result<(), TransportError> {
        if !self.is_connected() {
            let error = TransportError::NotConnected;
            self.record_failure(&error);
            return Err(error);
        }

        let payload =
            serde_json::to_vec(command).map_err(|e| TransportError::Serialization(e.to_string()))?;
        let payload_len = payload.len() as u64;

        let publish = self.client.publish(
            self.config.actuator_topic.clone(),
            QoS::AtLeastOnce,
            false,
            payload,
        );

        match tokio::time::timeout(self.config.publish_timeout, publish).await {
            Ok(Ok(())) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.messages_sent += 1;
                    stats.bytes_sent += payload_len;
                }
                info!(
                    "published command {:?} to {}",
                    command.command, self.config.actuator_topic
                );
                Ok(())
            }
            Ok(Err(e)) => {
                let error = TransportError::Client(e.to_string());
                self.record_failure(&error);
                Err(error)
            }
            Err(_) => {
                let error = TransportError::Timeout;
                self.record_failure(&error);
                Err(error)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_deployment() {
        let config = MqttConfig::new("localhost", 1883);
        assert_eq!(config.temperature_topic, "/sensor/temperature");
        assert_eq!(config.pressure_topic, "/sensor/pressure");
        assert_eq!(config.actuator_topic, "/actuator/valve");
        assert_eq!(config.publish_timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_builder() {
        let config = MqttConfig::new("broker.local", 8883)
            .client_id("control_center")
            .credentials("user", "secret")
            .reconnect_delay_secs(10)
            .publish_timeout_secs(3);

        assert_eq!(config.client_id, "control_center");
        assert_eq!(
            config.credentials,
            Some(("user".to_string(), "secret".to_string()))
        );
        assert_eq!(config.reconnect_delay, Duration::from_secs(10));
        assert_eq!(config.publish_timeout, Duration::from_secs(3));
    }

    #[test]
    fn topic_to_kind_mapping() {
        let config = MqttConfig::new("localhost", 1883);
        assert_eq!(
            config.kind_for_topic("/sensor/temperature"),
            Some(SensorKind::Temperature)
        );
        assert_eq!(
            config.kind_for_topic("/sensor/pressure"),
            Some(SensorKind::Pressure)
        );
        assert_eq!(config.kind_for_topic("/actuator/valve"), None);
        assert_eq!(config.kind_for_topic("/sensor/humidity"), None);
    }
}
