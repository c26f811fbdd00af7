// crates/trustgate-daemon/src/events.rs
//
// Background task that logs every accepted registry update.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use trustgate_registry::{RegistryEvent, ReputationRegistry};

pub fn spawn_event_logger(registry: Arc<ReputationRegistry>) -> JoinHandle<()> {
    let mut rx = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(RegistryEvent::ReputationUpdated {
                    subject,
                    tier,
                    expires_at,
                    nonce,
                    ..
                }) => {
                    tracing::info!(%subject, %tier, expires_at, nonce, "ReputationUpdated");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Registry event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
