//! Actuation publisher
//!
//! Sole writer of actuator commands and sole owner of the valve state.
//! The policy, per evaluation cycle:
//!
//! - `NoAction` verdicts are skipped outright.
//! - Automatic verdicts targeting the current position are skipped, so
//!   repeated identical verdicts never re-issue commands.
//! - Manual and cascade-override actuations always publish, even when the
//!   position is unchanged: manual republish resynchronizes a desynced
//!   actuator, and an override must land in the audit trail either way.
//! - The valve state is updated only after the transport acknowledges the
//!   publish. A failed publish leaves it untouched, so the next cycle that
//!   produces the same verdict retries the command.
//!
//! The publish itself happens outside the valve lock.

use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use valveguard_connectors::{ActuatorCommand, CommandSink, TransportError};
use valveguard_core::{TimeSource, Trigger, ValvePosition, ValveState, Verdict};

/// What a call to [`ActuationPublisher::apply`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A command was published and the valve state updated
    Published,
    /// Nothing was sent (no-action verdict or idempotent skip)
    Skipped,
}

/// Publisher of actuator commands, tracking the last commanded state
pub struct ActuationPublisher<S: CommandSink> {
    valve: Mutex<ValveState>,
    sink: S,
    clock: Arc<dyn TimeSource + Send + Sync>,
}

impl<S: CommandSink> ActuationPublisher<S> {
    /// Create a publisher with the configured startup position
    pub fn new(sink: S, initial: ValvePosition, clock: Arc<dyn TimeSource + Send + Sync>) -> Self {
        let now = clock.now();
        Self {
            valve: Mutex::new(ValveState::new(initial, now)),
            sink,
            clock,
        }
    }

    /// Copy of the current valve state
    pub fn valve_state(&self) -> ValveState {
        *self.valve.lock().unwrap()
    }

    /// Apply a verdict from the decision engine or the risk detector
    pub async fn apply(
        &self,
        verdict: Verdict,
        trigger: Trigger,
        reason: &str,
    ) -> Result<Outcome, TransportError> {
        let Some(target) = verdict.target_position() else {
            return Ok(Outcome::Skipped);
        };
        self.apply_position(target, trigger, reason).await
    }

    /// Apply an operator command; always publishes
    pub async fn apply_manual(&self, position: ValvePosition) -> Result<Outcome, TransportError> {
        self.apply_position(position, Trigger::Manual, "manual operator command")
            .await
    }

    async fn apply_position(
        &self,
        target: ValvePosition,
        trigger: Trigger,
        reason: &str,
    ) -> Result<Outcome, TransportError> {
        let current = self.valve_state();
        if !trigger.forces_publish() && current.position == target {
            debug!("valve already {target}, skipping redundant publish");
            return Ok(Outcome::Skipped);
        }

        let command = ActuatorCommand::new(target, trigger, reason);
        if let Err(e) = self.sink.publish_command(&command).await {
            warn!("publish of {target} failed, valve state unchanged: {e}");
            return Err(e);
        }

        let mut valve = self.valve.lock().unwrap();
        valve.position = target;
        valve.changed_at = self.clock.now();
        valve.trigger = trigger;
        info!("valve commanded {target} ({trigger:?}: {reason})");
        Ok(Outcome::Published)
    }
}
