//! End-to-end control loop tests
//!
//! Drive the controller with synthetic readings through a recording
//! command sink and alert sink: no broker, no relays, deterministic clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use valveguard_connectors::{ActuatorCommand, AlertEvent, AlertSink, CommandSink, TransportError};
use valveguard_core::{
    CascadeConfig, CascadeDetector, FixedClock, SensorKind, SensorReading, ThresholdConfig,
    Trigger, ValvePosition,
};
use valveguard_service::{ActuationPublisher, CommandError, ControlHandle, Controller};

#[derive(Clone, Default)]
struct MockSink {
    commands: Arc<Mutex<Vec<ActuatorCommand>>>,
    connected: Arc<AtomicBool>,
}

impl MockSink {
    fn up() -> Self {
        let sink = Self::default();
        sink.connected.store(true, Ordering::SeqCst);
        sink
    }

    fn sent(&self) -> Vec<ActuatorCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandSink for MockSink {
    async fn publish_command(&self, command: &ActuatorCommand) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct RecordingAlerts {
    events: Arc<Mutex<Vec<AlertEvent>>>,
}

impl RecordingAlerts {
    fn seen(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingAlerts {
    fn emit(&self, event: &AlertEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Rig {
    controller: Controller<MockSink>,
    handle: ControlHandle<MockSink>,
    sink: MockSink,
    alerts: RecordingAlerts,
}

fn rig(initial: ValvePosition) -> Rig {
    let sink = MockSink::up();
    let alerts = RecordingAlerts::default();
    let clock = Arc::new(FixedClock::new(1_000_000));

    let publisher = Arc::new(ActuationPublisher::new(
        sink.clone(),
        initial,
        clock.clone(),
    ));
    let (controller, handle) = Controller::new(
        ThresholdConfig::default(),
        CascadeDetector::new(CascadeConfig::default()),
        publisher,
        Arc::new(alerts.clone()),
        clock,
    );

    Rig {
        controller,
        handle,
        sink,
        alerts,
    }
}

fn reading(kind: SensorKind, value: f64, at: u64) -> SensorReading {
    SensorReading::new(kind, value, at).unwrap()
}

/// Alerts go through spawn_blocking; give them a moment to land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn high_pressure_opens_exactly_once() {
    let mut rig = rig(ValvePosition::Closed);

    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 160.0, 1000))
        .await;
    // Same verdict next cycle must not re-publish
    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 161.0, 2000))
        .await;

    let sent = rig.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].command, "OPEN");
    assert!(sent[0].automatic);

    let status = rig.handle.status();
    assert_eq!(status.valve.position, ValvePosition::Open);
    assert_eq!(status.valve.trigger, Trigger::Automatic);
}

#[tokio::test(flavor = "multi_thread")]
async fn dead_band_holds_and_publishes_nothing() {
    let mut rig = rig(ValvePosition::Closed);

    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 100.0, 1000))
        .await;
    rig.controller
        .handle_reading(reading(SensorKind::Temperature, 50.0, 1000))
        .await;

    assert!(rig.sink.sent().is_empty());
    assert_eq!(rig.handle.status().valve.position, ValvePosition::Closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn close_waits_for_both_sensors() {
    let mut rig = rig(ValvePosition::Open);

    // Pressure alone below min: dead-band, no command
    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 20.0, 1000))
        .await;
    assert!(rig.sink.sent().is_empty());

    // Temperature corroborates: close fires
    rig.controller
        .handle_reading(reading(SensorKind::Temperature, 5.0, 1500))
        .await;

    let sent = rig.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].command, "CLOSE");
    assert_eq!(rig.handle.status().valve.position, ValvePosition::Closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_reading_is_discarded() {
    let mut rig = rig(ValvePosition::Closed);

    rig.controller
        .handle_reading(reading(SensorKind::Temperature, 50.0, 2000))
        .await;
    // Out of order, and high enough to open if it were accepted
    rig.controller
        .handle_reading(reading(SensorKind::Temperature, 90.0, 1000))
        .await;

    assert!(rig.sink.sent().is_empty());
    let status = rig.handle.status();
    assert_eq!(status.temperature.unwrap().value, 50.0);
    assert_eq!(status.temperature.unwrap().observed_at, 2000);
}

#[tokio::test(flavor = "multi_thread")]
async fn cascading_risk_forces_close_from_the_dead_band() {
    let mut rig = rig(ValvePosition::Open);

    // Six paired samples: correlated, both rising past 2%, both ending
    // above 0.8x their max while still inside the dead-band, so the
    // decision engine alone would never act
    let temps = [60.0, 61.5, 63.0, 64.5, 66.0, 68.0];
    let pressures = [112.0, 115.0, 118.0, 121.0, 124.0, 127.5];
    for (i, (&t, &p)) in temps.iter().zip(&pressures).enumerate() {
        let at = (i as u64 + 1) * 1000;
        rig.controller
            .handle_reading(reading(SensorKind::Temperature, t, at))
            .await;
        rig.controller
            .handle_reading(reading(SensorKind::Pressure, p, at))
            .await;
    }
    settle().await;

    let sent = rig.sink.sent();
    assert!(!sent.is_empty(), "cascade override should have published");
    let close = sent.last().unwrap();
    assert_eq!(close.command, "CLOSE");
    assert!(close.automatic);
    assert!(close.reason.contains("cascading"));

    let status = rig.handle.status();
    assert_eq!(status.valve.position, ValvePosition::Closed);
    assert_eq!(status.valve.trigger, Trigger::CascadeOverride);

    let alerts = rig.alerts.seen();
    assert!(alerts.iter().any(|a| a.kind == "cascading_risk"));
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_close_suppresses_the_following_automatic_close() {
    let mut rig = rig(ValvePosition::Open);

    // Operator closes the valve
    let position = rig.handle.manual_command("close").await.unwrap();
    assert_eq!(position, ValvePosition::Closed);

    // The sensor-driven close that follows is an idempotent skip
    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 20.0, 1000))
        .await;
    rig.controller
        .handle_reading(reading(SensorKind::Temperature, 5.0, 1500))
        .await;

    let sent = rig.sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].automatic);
    assert_eq!(rig.handle.status().valve.trigger, Trigger::Manual);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_republish_of_current_position_is_forced() {
    let rig = rig(ValvePosition::Closed);

    // Already closed; the manual command must still go out
    rig.handle.manual_command("CLOSE").await.unwrap();
    assert_eq!(rig.sink.sent().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_manual_command_never_reaches_the_actuator() {
    let rig = rig(ValvePosition::Closed);

    let err = rig.handle.manual_command("VENT").await.unwrap_err();
    assert!(matches!(err, CommandError::Invalid(_)));
    assert!(rig.sink.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_publish_is_retried_on_the_next_cycle() {
    let mut rig = rig(ValvePosition::Closed);
    rig.sink.connected.store(false, Ordering::SeqCst);

    // Broker down: verdict computed, publish fails, state unchanged
    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 160.0, 1000))
        .await;
    assert!(rig.sink.sent().is_empty());
    assert_eq!(rig.handle.status().valve.position, ValvePosition::Closed);

    // Broker back: the next cycle with the same verdict publishes
    rig.sink.connected.store(true, Ordering::SeqCst);
    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 162.0, 2000))
        .await;

    let sent = rig.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].command, "OPEN");
    assert_eq!(rig.handle.status().valve.position, ValvePosition::Open);
}

#[tokio::test(flavor = "multi_thread")]
async fn critical_actuation_raises_an_alert() {
    let mut rig = rig(ValvePosition::Closed);

    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 160.0, 1000))
        .await;
    settle().await;

    let alerts = rig.alerts.seen();
    assert!(alerts.iter().any(|a| a.kind == "critical_values"));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_reports_verdict_for_the_same_snapshot() {
    let mut rig = rig(ValvePosition::Closed);

    rig.controller
        .handle_reading(reading(SensorKind::Pressure, 100.0, 1000))
        .await;
    rig.controller
        .handle_reading(reading(SensorKind::Temperature, 50.0, 1000))
        .await;

    let status = rig.handle.status();
    assert_eq!(status.pressure.unwrap().value, 100.0);
    assert_eq!(status.temperature.unwrap().value, 50.0);
    assert_eq!(
        serde_json::to_value(status.verdict).unwrap(),
        serde_json::json!("NO_ACTION")
    );
}
