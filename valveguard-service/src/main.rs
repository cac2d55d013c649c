//! Valveguard service entry point
//!
//! Assembly order mirrors the data flow: telemetry channel, publisher,
//! controller, then the registry sidecar. Shutdown runs the reverse of the
//! inbound path: unsubscribe the sensor topics, stop the sidecar, then
//! disconnect the transport.

use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use valveguard_connectors::{AlertSink, HttpAlertSink, MqttTelemetry, RegistryClient};
use valveguard_core::{CascadeDetector, SystemClock, TimeSource};
use valveguard_service::{Controller, ServiceConfig};
use valveguard_service::publisher::ActuationPublisher;
use valveguard_service::sidecar;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;
    let clock: Arc<dyn TimeSource + Send + Sync> = Arc::new(SystemClock);

    // Telemetry channel; the driver keeps retrying if the broker is down,
    // and the command/status surfaces stay useful meanwhile
    let (telemetry, readings, driver) =
        MqttTelemetry::connect(config.mqtt.clone(), Arc::clone(&clock));

    let publisher = Arc::new(ActuationPublisher::new(
        telemetry.clone(),
        config.initial_position,
        Arc::clone(&clock),
    ));
    let alerts: Arc<dyn AlertSink> =
        Arc::new(HttpAlertSink::new(config.alert_relay_urls.clone()));

    let (controller, handle) = Controller::new(
        config.thresholds,
        CascadeDetector::new(config.cascade),
        Arc::clone(&publisher),
        alerts,
        Arc::clone(&clock),
    );
    let control_task = tokio::spawn(controller.run(readings));

    let registry = Arc::new(RegistryClient::new(
        &config.catalog_url,
        config.service_record(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let heartbeat = sidecar::spawn_registration(registry, config.heartbeat_interval, shutdown_rx);

    info!("valveguard {} running, ctrl-c to stop", valveguard_core::VERSION);
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    // Shutdown order: inbound topics, registration, transport
    if let Err(e) = telemetry.unsubscribe_inbound().await {
        warn!("could not unsubscribe inbound topics: {e}");
    }
    let _ = shutdown_tx.send(true);
    let _ = heartbeat.await;
    if let Err(e) = telemetry.disconnect().await {
        warn!("disconnect failed: {e}");
    }
    let _ = driver.await;
    let _ = control_task.await;

    let status = handle.status();
    info!(
        "final state: valve {} ({:?})",
        status.valve.position, status.valve.trigger
    );
    let stats = telemetry.stats();
    info!(
        "session stats: {} commands sent, {} failed, {} connections",
        stats.messages_sent, stats.messages_failed, stats.reconnections
    );
    Ok(())
}
