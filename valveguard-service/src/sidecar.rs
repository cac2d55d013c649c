//! Registration sidecar
//!
//! Heartbeats the resource catalog on its own task, fully independent of
//! the control path: it shares no mutable state with it and its failures
//! only ever produce log lines. Registration retries forever; the interval
//! carries a small capped jitter so a fleet of restarting services does not
//! hammer the registry in lockstep.

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use valveguard_connectors::RegistryClient;

/// Maximum jitter added to the heartbeat interval
const MAX_JITTER: Duration = Duration::from_secs(5);

/// Spawn the heartbeat task; flips of the `shutdown` channel stop it
pub fn spawn_registration(
    client: Arc<RegistryClient>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "registration sidecar started ({} every {interval:?})",
            client.record().id
        );

        loop {
            register_once(&client).await;

            tokio::select! {
                _ = tokio::time::sleep(jittered(interval)) => {}
                _ = shutdown.changed() => {
                    info!("registration sidecar stopped");
                    return;
                }
            }
        }
    })
}

async fn register_once(client: &Arc<RegistryClient>) {
    let client = Arc::clone(client);
    match tokio::task::spawn_blocking(move || client.register()).await {
        Ok(Ok(())) => info!("registered with resource catalog"),
        Ok(Err(e)) => warn!("registry heartbeat failed, will retry: {e}"),
        Err(e) => warn!("registry heartbeat task panicked: {e}"),
    }
}

/// Interval plus up to 10% random jitter, capped at [`MAX_JITTER`]
fn jittered(interval: Duration) -> Duration {
    let ceiling = (interval / 10).min(MAX_JITTER);
    let jitter_ms = ceiling.as_millis() as u64;
    if jitter_ms == 0 {
        return interval;
    }
    interval + Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
}
