//! Environment-based service configuration
//!
//! Loaded once at startup, immutable for the process lifetime. Variable
//! names and defaults match the surrounding deployment, so this service
//! drops into an existing compose file unchanged.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use valveguard_connectors::{MqttConfig, ServiceRecord};
use valveguard_core::{CascadeConfig, ThresholdConfig, ValvePosition};

/// Configuration loading failures; fatal at startup, nowhere else
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unparseable value
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value found in the environment
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Telemetry channel settings
    pub mqtt: MqttConfig,
    /// Actuation thresholds
    pub thresholds: ThresholdConfig,
    /// Risk detector tuning
    pub cascade: CascadeConfig,
    /// Resource catalog base URL
    pub catalog_url: String,
    /// Notification relay base URLs
    pub alert_relay_urls: Vec<String>,
    /// Host this service is reachable on, announced to the registry
    pub service_host: String,
    /// Port the operator-facing wrapper listens on
    pub service_port: u16,
    /// Registry heartbeat interval
    pub heartbeat_interval: Duration,
    /// Valve position assumed at startup
    pub initial_position: ValvePosition,
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mqtt_host = env_or("MQTT_BROKER_HOST", "localhost");
        let mqtt_port: u16 = parse_env("MQTT_BROKER_PORT", 1883)?;
        let mut mqtt = MqttConfig::new(mqtt_host, mqtt_port)
            .client_id(env_or("MQTT_CLIENT_ID", "valveguard"));

        let username = env_or("MQTT_USERNAME", "");
        let password = env_or("MQTT_PASSWORD", "");
        if !username.is_empty() && !password.is_empty() {
            mqtt = mqtt.credentials(username, password);
        }

        let thresholds = ThresholdConfig::new(
            parse_env("PRESSURE_MIN_THRESHOLD", 30.0)?,
            parse_env("PRESSURE_MAX_THRESHOLD", 150.0)?,
            parse_env("TEMPERATURE_MIN_THRESHOLD", 10.0)?,
            parse_env("TEMPERATURE_MAX_THRESHOLD", 80.0)?,
        );

        let cascade = CascadeConfig {
            window_ms: parse_env("CASCADE_WINDOW_MINUTES", 30u64)? * 60 * 1000,
            ..CascadeConfig::default()
        };

        let initial = env_or("VALVE_INITIAL_POSITION", "CLOSE");
        let initial_position =
            ValvePosition::from_command(&initial).map_err(|e| ConfigError::Invalid {
                key: "VALVE_INITIAL_POSITION",
                value: initial,
                reason: e.to_string(),
            })?;

        Ok(Self {
            mqtt,
            thresholds,
            cascade,
            catalog_url: env_or("CATALOG_URL", "http://localhost:8080"),
            alert_relay_urls: split_urls(&env_or("ALERT_RELAY_URLS", "")),
            service_host: env_or("SERVICE_HOST", "localhost"),
            service_port: parse_env("SERVICE_PORT", 8081)?,
            heartbeat_interval: Duration::from_secs(parse_env("HEARTBEAT_INTERVAL_SECS", 60)?),
            initial_position,
        })
    }

    /// Identity record announced to the resource catalog
    pub fn service_record(&self) -> ServiceRecord {
        ServiceRecord {
            id: "valveguard".to_string(),
            name: "Valveguard Control".to_string(),
            endpoint: format!("http://{}:{}", self.service_host, self.service_port),
            port: self.service_port,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
