// crates/trustgate-registry/src/registry.rs
//
// ReputationRegistry: the single writer of anchored reputation.
//
// Every subject owns a versioned slot (nonce -> Anchor) behind its own async
// mutex. The subject map lock is held only long enough to find or create the
// slot, so updates for different subjects never wait on each other, while the
// nonce check and the write for one subject happen under one lock hold.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use trustgate_core::address::Address;
use trustgate_core::attestation::{Anchor, AttestationSignature, AttestationUpdate, RegistryDomain};
use trustgate_core::error::TrustgateError;
use trustgate_core::traits::AnchorSource;

use crate::events::RegistryEvent;

/// Capacity of the event broadcast channel. Slow subscribers lag, they
/// never block writers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Every accepted anchor for one subject, keyed by nonce.
#[derive(Debug, Default)]
struct AnchorHistory {
    versions: BTreeMap<u64, Anchor>,
}

impl AnchorHistory {
    fn current(&self) -> Anchor {
        self.versions
            .last_key_value()
            .map(|(_, anchor)| *anchor)
            .unwrap_or_default()
    }
}

/// Registry of authority-signed reputation anchors.
#[derive(Debug)]
pub struct ReputationRegistry {
    domain: RegistryDomain,
    /// Address of the only key allowed to sign updates.
    authority: Address,
    subjects: RwLock<HashMap<Address, Arc<Mutex<AnchorHistory>>>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl ReputationRegistry {
    pub fn new(domain: RegistryDomain, authority: Address) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            domain,
            authority,
            subjects: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn domain(&self) -> &RegistryDomain {
        &self.domain
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    /// Receive every `ReputationUpdated` event accepted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Apply a signed tier update.
    ///
    /// Fails with `InvalidAuthoritySignature` when the signature does not
    /// verify or was made by any key other than the authority, and with
    /// `NonceNotIncreasing` when `update.nonce` is not strictly greater than
    /// the subject's anchored nonce. A rejected update leaves no trace.
    pub async fn update_reputation(
        &self,
        update: &AttestationUpdate,
        signature: &AttestationSignature,
    ) -> Result<RegistryEvent, TrustgateError> {
        let signer = signature.recover_signer(update, &self.domain)?;
        if signer != self.authority {
            warn!(
                subject = %update.subject,
                signer = %signer,
                "Rejected attestation from non-authority signer"
            );
            return Err(TrustgateError::InvalidAuthoritySignature);
        }

        let slot = self.slot_for(&update.subject).await;
        let mut history = slot.lock().await;

        let stored = history.current().nonce;
        if update.nonce <= stored {
            warn!(
                subject = %update.subject,
                stored,
                received = update.nonce,
                "Rejected attestation with stale nonce"
            );
            return Err(TrustgateError::NonceNotIncreasing {
                stored,
                received: update.nonce,
            });
        }

        history.versions.insert(update.nonce, Anchor::from_update(update));
        drop(history);

        info!(
            subject = %update.subject,
            tier = %update.tier,
            nonce = update.nonce,
            expires_at = update.expires_at,
            "Reputation anchored"
        );

        let event = RegistryEvent::ReputationUpdated {
            subject: update.subject,
            tier: update.tier,
            snapshot_hash: update.snapshot_hash,
            expires_at: update.expires_at,
            nonce: update.nonce,
            signer,
        };
        // No subscribers is not an error.
        let _ = self.events.send(event.clone());
        Ok(event)
    }

    /// The current anchor for `subject`, or the zero tuple if never anchored.
    pub async fn get_reputation(&self, subject: &Address) -> Anchor {
        let slot = {
            let subjects = self.subjects.read().await;
            subjects.get(subject).cloned()
        };
        let anchor = match slot {
            Some(slot) => slot.lock().await.current(),
            None => Anchor::default(),
        };
        debug!(subject = %subject, nonce = anchor.nonce, "Anchor read");
        anchor
    }

    /// Every accepted anchor for `subject`, oldest nonce first.
    pub async fn history(&self, subject: &Address) -> Vec<Anchor> {
        let slot = {
            let subjects = self.subjects.read().await;
            subjects.get(subject).cloned()
        };
        match slot {
            Some(slot) => slot.lock().await.versions.values().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Number of subjects with at least one accepted anchor.
    pub async fn subject_count(&self) -> usize {
        self.subjects.read().await.len()
    }

    async fn slot_for(&self, subject: &Address) -> Arc<Mutex<AnchorHistory>> {
        if let Some(slot) = self.subjects.read().await.get(subject) {
            return Arc::clone(slot);
        }
        let mut subjects = self.subjects.write().await;
        Arc::clone(subjects.entry(*subject).or_default())
    }
}

#[async_trait]
impl AnchorSource for ReputationRegistry {
    async fn get_reputation(&self, subject: &Address) -> Result<Anchor, TrustgateError> {
        Ok(ReputationRegistry::get_reputation(self, subject).await)
    }
}
