//! Delivery-triggered control loop
//!
//! One task owns this controller and consumes the inbound reading channel:
//! each accepted reading immediately triggers one evaluation pass, which
//! keeps detection latency at one delivery. The pass is short, synchronous
//! and non-blocking; publishing and alerting happen after the store lock is
//! released.
//!
//! Verdicts are explicit values flowing from the decision engine and the
//! risk detector into the publisher - the two never call each other, which
//! is what keeps them independently testable. The risk detector's
//! `FORCE_CLOSE` supersedes whatever the decision engine computed for the
//! same snapshot, even an `OPEN`.

use crate::api::ControlHandle;
use crate::publisher::{ActuationPublisher, Outcome};
use log::{debug, info, warn};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use valveguard_connectors::{AlertEvent, AlertSink, CommandSink};
use valveguard_core::{
    decide, CascadeDetector, ControlError, ReadingStore, RiskAssessment, SensorReading, Snapshot,
    ThresholdConfig, TimeSource, Trigger, Verdict,
};

/// The control loop: reading store, decision engine, risk detector and
/// publisher, evaluated once per accepted reading
pub struct Controller<S: CommandSink> {
    store: Arc<Mutex<ReadingStore>>,
    thresholds: ThresholdConfig,
    detector: CascadeDetector,
    publisher: Arc<ActuationPublisher<S>>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn TimeSource + Send + Sync>,
}

impl<S: CommandSink> Controller<S> {
    /// Assemble the controller and the handle exposing its query surfaces
    pub fn new(
        thresholds: ThresholdConfig,
        detector: CascadeDetector,
        publisher: Arc<ActuationPublisher<S>>,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn TimeSource + Send + Sync>,
    ) -> (Self, ControlHandle<S>) {
        let store = Arc::new(Mutex::new(ReadingStore::new()));
        let handle = ControlHandle::new(Arc::clone(&store), thresholds, Arc::clone(&publisher));

        let controller = Self {
            store,
            thresholds,
            detector,
            publisher,
            alerts,
            clock,
        };
        (controller, handle)
    }

    /// Consume the inbound channel until it closes
    pub async fn run(mut self, mut readings: mpsc::Receiver<SensorReading>) {
        info!("control loop started (thresholds: {:?})", self.thresholds);
        while let Some(reading) = readings.recv().await {
            self.handle_reading(reading).await;
        }
        info!("inbound channel closed, control loop stopped");
    }

    /// Ingest one reading and run an evaluation pass if it is accepted
    pub async fn handle_reading(&mut self, reading: SensorReading) {
        let snapshot = {
            let mut store = self.store.lock().unwrap();
            match store.update(reading) {
                Ok(()) => store.snapshot(),
                Err(e @ ControlError::StaleReading { .. }) => {
                    debug!("{e}");
                    return;
                }
                Err(e) => {
                    warn!("rejected reading: {e}");
                    return;
                }
            }
        };

        self.evaluate(snapshot).await;
    }

    async fn evaluate(&mut self, snapshot: Snapshot) {
        self.detector.observe(&snapshot);
        let verdict = decide(&snapshot, &self.thresholds);

        match self.detector.assess(&self.thresholds) {
            RiskAssessment::Risk {
                correlation,
                temperature_trend,
                pressure_trend,
                latest_temperature,
                latest_pressure,
            } => {
                warn!(
                    "cascading failure risk (correlation {correlation:.3}, trends \
                     {temperature_trend:.3}/{pressure_trend:.3}), forcing valve closed"
                );

                self.send_alert(AlertEvent::new(
                    "cascading_risk",
                    "temperature and pressure jointly trending toward failure",
                    self.clock.now(),
                    Some(json!({
                        "temperature": latest_temperature,
                        "pressure": latest_pressure,
                        "correlation": correlation,
                        "risk": true,
                    })),
                ));

                // Supersedes the engine's verdict, whatever it was
                if let Err(e) = self
                    .publisher
                    .apply(Verdict::Close, Trigger::CascadeOverride, "cascading failure risk")
                    .await
                {
                    warn!("cascade override publish failed, retried next cycle: {e}");
                }
            }
            RiskAssessment::NoRisk => {
                match self
                    .publisher
                    .apply(verdict, Trigger::Automatic, "threshold decision")
                    .await
                {
                    Ok(Outcome::Published) => self.alert_if_critical(&snapshot, verdict),
                    Ok(Outcome::Skipped) => {}
                    Err(e) => warn!("actuation publish failed, retried next cycle: {e}"),
                }
            }
        }
    }

    /// Raise a `critical_values` alert when an actuation fired while either
    /// reading sits outside its band
    fn alert_if_critical(&self, snapshot: &Snapshot, verdict: Verdict) {
        let pressure_critical = snapshot
            .pressure
            .is_some_and(|r| self.thresholds.is_pressure_critical(r.value));
        let temperature_critical = snapshot
            .temperature
            .is_some_and(|r| self.thresholds.is_temperature_critical(r.value));

        if !pressure_critical && !temperature_critical {
            return;
        }

        self.send_alert(AlertEvent::new(
            "critical_values",
            "sensor values outside the safe band, valve actuated",
            self.clock.now(),
            Some(json!({
                "temperature": snapshot.temperature.map(|r| r.value),
                "pressure": snapshot.pressure.map(|r| r.value),
                "action_taken": verdict,
            })),
        ));
    }

    /// Fire-and-forget alert emission, off the control path
    fn send_alert(&self, event: AlertEvent) {
        let sink = Arc::clone(&self.alerts);
        tokio::task::spawn_blocking(move || sink.emit(&event));
    }
}
