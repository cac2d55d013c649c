//! Manual-command and status surfaces
//!
//! These are the in-process surfaces the operator-facing REST wrapper (an
//! external collaborator) calls into. Both stay useful while the broker is
//! down: status reads never touch the network, and a manual command fails
//! fast with a transport error the wrapper can surface.

use crate::publisher::ActuationPublisher;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use valveguard_connectors::{CommandSink, TransportError};
use valveguard_core::{
    decide, ControlError, ReadingStore, SensorReading, ThresholdConfig, ValvePosition, ValveState,
    Verdict,
};

/// Failures of the manual command surface
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command was not OPEN or CLOSE; nothing was published
    #[error(transparent)]
    Invalid(#[from] ControlError),

    /// The command was valid but the transport could not deliver it
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Read-time status: the latest snapshot plus the verdict computed against
/// that same snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Latest temperature reading, if observed
    pub temperature: Option<SensorReading>,
    /// Latest pressure reading, if observed
    pub pressure: Option<SensorReading>,
    /// What the decision engine says about this exact snapshot
    pub verdict: Verdict,
    /// Last commanded valve state
    pub valve: ValveState,
}

/// Cloneable handle to the control loop's query and command surfaces
pub struct ControlHandle<S: CommandSink> {
    store: Arc<Mutex<ReadingStore>>,
    thresholds: ThresholdConfig,
    publisher: Arc<ActuationPublisher<S>>,
}

impl<S: CommandSink> Clone for ControlHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            thresholds: self.thresholds,
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<S: CommandSink> ControlHandle<S> {
    pub(crate) fn new(
        store: Arc<Mutex<ReadingStore>>,
        thresholds: ThresholdConfig,
        publisher: Arc<ActuationPublisher<S>>,
    ) -> Self {
        Self {
            store,
            thresholds,
            publisher,
        }
    }

    /// Execute an operator command
    ///
    /// Case-insensitive; anything but OPEN/CLOSE is rejected before it can
    /// reach the publisher. Valid commands always force a publish, even
    /// when the valve already holds the commanded position.
    pub async fn manual_command(&self, raw: &str) -> Result<ValvePosition, CommandError> {
        let position = ValvePosition::from_command(raw)?;
        self.publisher.apply_manual(position).await?;
        Ok(position)
    }

    /// Read-only status query, no side effects
    pub fn status(&self) -> StatusReport {
        let snapshot = self.store.lock().unwrap().snapshot();
        StatusReport {
            temperature: snapshot.temperature,
            pressure: snapshot.pressure,
            verdict: decide(&snapshot, &self.thresholds),
            valve: self.publisher.valve_state(),
        }
    }
}
