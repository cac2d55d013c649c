//! Service registry client
//!
//! Best-effort side channel to the external resource catalog. The control
//! loop never waits on it: registration runs from its own periodic task,
//! carries a short timeout, and a registry that is down simply means the
//! next heartbeat tries again.

use crate::messages::ServiceRecord;
use std::time::Duration;
use thiserror::Error;

/// Registry request failures
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    /// The registry answered with a non-success status
    #[error("registry rejected registration: status {0}")]
    Rejected(u16),
}

/// Blocking HTTP client for the resource catalog
///
/// Blocking by design: callers run it on a dedicated task (or through
/// `spawn_blocking`), never on the control path.
pub struct RegistryClient {
    agent: ureq::Agent,
    services_url: String,
    record: ServiceRecord,
}

impl RegistryClient {
    /// Default per-request timeout
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a client registering `record` at `<catalog_url>/services`
    pub fn new(catalog_url: &str, record: ServiceRecord) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Self::REQUEST_TIMEOUT)
            .build();

        Self {
            agent,
            services_url: format!("{}/services", catalog_url.trim_end_matches('/')),
            record,
        }
    }

    /// The record this client announces
    pub fn record(&self) -> &ServiceRecord {
        &self.record
    }

    /// Register (or refresh) this service with the catalog
    pub fn register(&self) -> Result<(), RegistryError> {
        let body = serde_json::to_string(&self.record)
            .map_err(|e| RegistryError::Unreachable(e.to_string()))?;

        match self
            .agent
            .post(&self.services_url)
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, _)) => Err(RegistryError::Rejected(code)),
            Err(ureq::Error::Transport(e)) => Err(RegistryError::Unreachable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ServiceRecord {
        ServiceRecord {
            id: "valveguard".to_string(),
            name: "Valveguard Control".to_string(),
            endpoint: "http://10.0.0.5:8081".to_string(),
            port: 8081,
        }
    }

    #[test]
    fn services_url_construction() {
        let client = RegistryClient::new("http://localhost:8080", record());
        assert_eq!(client.services_url, "http://localhost:8080/services");

        // Trailing slash must not double up
        let client = RegistryClient::new("http://localhost:8080/", record());
        assert_eq!(client.services_url, "http://localhost:8080/services");
    }

    #[test]
    fn unreachable_registry_is_an_error_not_a_panic() {
        // Nothing listens on this port; the request must fail cleanly
        let client = RegistryClient::new("http://127.0.0.1:1", record());
        assert!(matches!(
            client.register(),
            Err(RegistryError::Unreachable(_))
        ));
    }
}
