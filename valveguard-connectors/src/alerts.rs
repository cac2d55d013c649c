//! Fire-and-forget alert delivery
//!
//! Alerts fan out to the human notification relays (web dashboard, chat
//! bot). Delivery is strictly best-effort: every failure is logged and
//! forgotten, and one dead relay never stops the others from being tried.
//! Retries are the relays' problem, not the control loop's.

use crate::messages::AlertEvent;
use log::{info, warn};
use std::time::Duration;

/// Sink for alert events
///
/// The controller holds this as a trait object so tests can substitute a
/// recording sink.
pub trait AlertSink: Send + Sync {
    /// Deliver an alert; must never fail the caller
    fn emit(&self, event: &AlertEvent);
}

/// HTTP alert sink posting to each relay's `/api/alerts` endpoint
///
/// Blocking by design, like the registry client; the controller dispatches
/// emissions through `spawn_blocking`.
pub struct HttpAlertSink {
    agent: ureq::Agent,
    endpoints: Vec<String>,
}

impl HttpAlertSink {
    /// Default per-request timeout
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a sink delivering to the given relay base URLs
    pub fn new(relay_urls: impl IntoIterator<Item = String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Self::REQUEST_TIMEOUT)
            .build();

        Self {
            agent,
            endpoints: relay_urls
                .into_iter()
                .map(|url| format!("{}/api/alerts", url.trim_end_matches('/')))
                .collect(),
        }
    }

    /// Number of configured relay endpoints
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

impl AlertSink for HttpAlertSink {
    fn emit(&self, event: &AlertEvent) {
        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                warn!("could not serialize alert event: {e}");
                return;
            }
        };

        for endpoint in &self.endpoints {
            match self
                .agent
                .post(endpoint)
                .set("Content-Type", "application/json")
                .send_string(&body)
            {
                Ok(_) => info!("alert {:?} delivered to {endpoint}", event.kind),
                Err(e) => warn!("could not deliver alert {:?} to {endpoint}: {e}", event.kind),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_normalized() {
        let sink = HttpAlertSink::new([
            "http://dashboard:8084".to_string(),
            "http://telegram-bot:8085/".to_string(),
        ]);
        assert_eq!(sink.endpoint_count(), 2);
        assert_eq!(sink.endpoints[0], "http://dashboard:8084/api/alerts");
        assert_eq!(sink.endpoints[1], "http://telegram-bot:8085/api/alerts");
    }

    #[test]
    fn emit_with_dead_relays_does_not_panic() {
        let sink = HttpAlertSink::new(["http://127.0.0.1:1".to_string()]);
        let event = AlertEvent::new("critical_values", "pressure out of range", 0, None);

        // Failure is logged and swallowed
        sink.emit(&event);
    }
}
