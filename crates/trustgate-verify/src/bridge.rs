// crates/trustgate-verify/src/bridge.rs
//
// VerificationBridge: off-chain snapshot vs on-chain anchor reconciliation.
//
// Steps for a user:
//   1. Read the latest snapshot (missing -> SnapshotMissing).
//   2. Recompute its canonical hash. The stored hash is never trusted.
//   3. Resolve the linked wallet and read its anchor.
//   4. verified = local == anchored && now < expires_at.
//
// Every read is bounded by `timeout`. Timeouts and errors from any
// collaborator collapse to an unverified verdict.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use trustgate_core::clock::Clock;
use trustgate_core::error::TrustgateError;
use trustgate_core::snapshot::TrustSnapshot;
use trustgate_core::traits::{AnchorSource, TrustSnapshotStore, WalletDirectory};

use crate::verdict::{HashLookup, TrustVerdict, VerdictReason};

/// Default bound on each collaborator read.
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_millis(2_000);

pub struct VerificationBridge {
    snapshots: Arc<dyn TrustSnapshotStore>,
    wallets: Arc<dyn WalletDirectory>,
    anchors: Arc<dyn AnchorSource>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl VerificationBridge {
    pub fn new(
        snapshots: Arc<dyn TrustSnapshotStore>,
        wallets: Arc<dyn WalletDirectory>,
        anchors: Arc<dyn AnchorSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            snapshots,
            wallets,
            anchors,
            clock,
            timeout: DEFAULT_BRIDGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reconcile the user's latest snapshot with its anchor.
    ///
    /// # Errors
    /// Only `SnapshotMissing`, when the store answered and has no row for the
    /// user. Every other failure is reported inside the verdict.
    pub async fn verify_trust_snapshot(&self, user_id: &Uuid) -> Result<TrustVerdict, TrustgateError> {
        let (_, verdict) = self.reconcile(user_id).await?;
        Ok(verdict)
    }

    /// The exact snapshot row that verified, for callers that must act on it.
    ///
    /// # Errors
    /// `IntegrityMismatch` when the snapshot is missing or did not verify.
    pub async fn verified_snapshot(&self, user_id: &Uuid) -> Result<TrustSnapshot, TrustgateError> {
        match self.reconcile(user_id).await {
            Ok((Some(snapshot), verdict)) if verdict.verified => Ok(snapshot),
            Ok((_, verdict)) => {
                let reason = verdict
                    .reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unverified".to_string());
                Err(TrustgateError::IntegrityMismatch(format!(
                    "Trust snapshot for {} failed verification: {}",
                    user_id, reason
                )))
            }
            Err(TrustgateError::SnapshotMissing(_)) => Err(TrustgateError::IntegrityMismatch(
                format!("No trust snapshot recorded for {}", user_id),
            )),
            Err(e) => Err(e),
        }
    }

    /// Look a hash up in the snapshot store without chain reconciliation.
    ///
    /// A row is valid only if its recomputed hash matches. Store failures
    /// report `is_valid = false`.
    pub async fn verify_snapshot_hash(&self, hash: &[u8; 32]) -> HashLookup {
        match self.bounded(self.snapshots.find_by_hash(hash)).await {
            Ok(Some(snapshot)) if snapshot.compute_hash() == *hash => HashLookup {
                is_valid: true,
                snapshot_time: Some(snapshot.snapshot_time),
            },
            Ok(_) => HashLookup::invalid(),
            Err(e) => {
                warn!(hash = %hex::encode(hash), error = %e, "Hash lookup failed closed");
                HashLookup::invalid()
            }
        }
    }

    async fn reconcile(
        &self,
        user_id: &Uuid,
    ) -> Result<(Option<TrustSnapshot>, TrustVerdict), TrustgateError> {
        let snapshot = match self.bounded(self.snapshots.latest_snapshot(user_id)).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return Err(TrustgateError::SnapshotMissing(format!(
                    "No trust snapshot for user {}",
                    user_id
                )))
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Snapshot read failed; unverified");
                return Ok((
                    None,
                    TrustVerdict::rejected(VerdictReason::StoreUnavailable, None, None),
                ));
            }
        };
        let local = snapshot.compute_hash();

        let wallet = match self.bounded(self.wallets.wallet_for(user_id)).await {
            Ok(Some(wallet)) => wallet,
            Ok(None) => {
                return Ok(self.reject(user_id, snapshot, VerdictReason::WalletNotLinked, &local, None))
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Wallet lookup failed");
                return Ok(self.reject(user_id, snapshot, VerdictReason::WalletUnavailable, &local, None));
            }
        };

        let anchor = match self.bounded(self.anchors.get_reputation(&wallet)).await {
            Ok(anchor) => anchor,
            Err(e) => {
                warn!(user_id = %user_id, wallet = %wallet, error = %e, "Anchor read failed");
                return Ok(self.reject(user_id, snapshot, VerdictReason::AnchorUnavailable, &local, None));
            }
        };
        if anchor.is_unset() {
            return Ok(self.reject(user_id, snapshot, VerdictReason::NotAnchored, &local, None));
        }
        if anchor.snapshot_hash != local {
            return Ok(self.reject(
                user_id,
                snapshot,
                VerdictReason::HashMismatch,
                &local,
                Some(&anchor.snapshot_hash),
            ));
        }
        if !anchor.is_live_at(self.clock.unix_now()) {
            return Ok(self.reject(
                user_id,
                snapshot,
                VerdictReason::AnchorExpired,
                &local,
                Some(&anchor.snapshot_hash),
            ));
        }

        debug!(user_id = %user_id, wallet = %wallet, "Trust snapshot verified");
        let verdict = TrustVerdict::verified(&local, &anchor.snapshot_hash);
        Ok((Some(snapshot), verdict))
    }

    fn reject(
        &self,
        user_id: &Uuid,
        snapshot: TrustSnapshot,
        reason: VerdictReason,
        local: &[u8; 32],
        onchain: Option<&[u8; 32]>,
    ) -> (Option<TrustSnapshot>, TrustVerdict) {
        warn!(user_id = %user_id, reason = %reason, "Trust snapshot not verified");
        (
            Some(snapshot),
            TrustVerdict::rejected(reason, Some(local), onchain),
        )
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, TrustgateError>>,
    ) -> Result<T, TrustgateError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TrustgateError::Unavailable(format!(
                "Read exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use trustgate_core::address::Address;
    use trustgate_core::attestation::{Anchor, AttestationUpdate, RegistryDomain};
    use trustgate_core::clock::ManualClock;
    use trustgate_core::crypto::Keypair;
    use trustgate_core::snapshot::Tier;
    use trustgate_registry::ReputationRegistry;
    use trustgate_store::MemoryStore;

    const NOW: i64 = 1_800_000_000;
    const WALLET: Address = Address([0x42; 20]);

    struct Fixture {
        store: Arc<MemoryStore>,
        registry: Arc<ReputationRegistry>,
        authority: Keypair,
        clock: Arc<ManualClock>,
        bridge: VerificationBridge,
    }

    fn domain() -> RegistryDomain {
        RegistryDomain {
            registry_address: Address([0xee; 20]),
            chain_id: 31337,
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let authority = Keypair::generate();
        let registry = Arc::new(ReputationRegistry::new(domain(), authority.address()));
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let bridge = VerificationBridge::new(store.clone(), store.clone(), registry.clone(), clock.clone());
        Fixture {
            store,
            registry,
            authority,
            clock,
            bridge,
        }
    }

    fn snapshot(user: Uuid) -> TrustSnapshot {
        let t = Utc.timestamp_opt(NOW - 60, 0).unwrap();
        TrustSnapshot::new(user, 72, Tier::new(1), "risk-v3", [8; 32], t).unwrap()
    }

    async fn anchor(f: &Fixture, hash: [u8; 32], expires_at: i64, nonce: u64) {
        let update = AttestationUpdate {
            subject: WALLET,
            tier: Tier::new(1),
            snapshot_hash: hash,
            expires_at,
            nonce,
        };
        f.registry
            .update_reputation(&update, &update.sign(&domain(), &f.authority))
            .await
            .unwrap();
    }

    async fn seeded(f: &Fixture) -> (Uuid, TrustSnapshot) {
        let user = Uuid::now_v7();
        let snap = snapshot(user);
        f.store.save_snapshot(&snap).await.unwrap();
        f.store.link_wallet(&user, WALLET).await.unwrap();
        (user, snap)
    }

    #[tokio::test]
    async fn test_matching_live_anchor_verifies() {
        let f = fixture();
        let (user, snap) = seeded(&f).await;
        anchor(&f, snap.snapshot_hash, NOW + 3600, 1).await;

        let verdict = f.bridge.verify_trust_snapshot(&user).await.unwrap();
        assert!(verdict.verified);
        assert_eq!(verdict.local_hash, verdict.onchain_hash);
        assert_eq!(f.bridge.verified_snapshot(&user).await.unwrap(), snap);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_an_error() {
        let f = fixture();
        let err = f.bridge.verify_trust_snapshot(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, TrustgateError::SnapshotMissing(_)));

        let err = f.bridge.verified_snapshot(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, TrustgateError::IntegrityMismatch(_)));
    }

    #[tokio::test]
    async fn test_unanchored_wallet_fails_closed() {
        let f = fixture();
        let (user, _) = seeded(&f).await;
        let verdict = f.bridge.verify_trust_snapshot(&user).await.unwrap();
        assert!(!verdict.verified);
        assert_eq!(verdict.reason, Some(VerdictReason::NotAnchored));
    }

    #[tokio::test]
    async fn test_unlinked_wallet_fails_closed() {
        let f = fixture();
        let user = Uuid::now_v7();
        f.store.save_snapshot(&snapshot(user)).await.unwrap();
        let verdict = f.bridge.verify_trust_snapshot(&user).await.unwrap();
        assert_eq!(verdict.reason, Some(VerdictReason::WalletNotLinked));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let f = fixture();
        let (user, snap) = seeded(&f).await;
        anchor(&f, snap.snapshot_hash, NOW + 10, 1).await;
        assert!(f.bridge.verify_trust_snapshot(&user).await.unwrap().verified);

        f.clock.advance_secs(10);
        let verdict = f.bridge.verify_trust_snapshot(&user).await.unwrap();
        assert!(!verdict.verified);
        assert_eq!(verdict.reason, Some(VerdictReason::AnchorExpired));
    }

    #[tokio::test]
    async fn test_any_field_change_breaks_verification() {
        let user = Uuid::now_v7();
        let anchored = snapshot(user);
        let t = anchored.snapshot_time;

        // Same subject and timestamp as the anchored row; exactly one field differs.
        let mutations = [
            ("score", TrustSnapshot::new(user, 73, anchored.tier, "risk-v3", [8; 32], t).unwrap()),
            ("tier", TrustSnapshot::new(user, 72, Tier::new(0), "risk-v3", [8; 32], t).unwrap()),
            ("model_version", TrustSnapshot::new(user, 72, anchored.tier, "risk-v4", [8; 32], t).unwrap()),
            ("feature_vector_hash", TrustSnapshot::new(user, 72, anchored.tier, "risk-v3", [9; 32], t).unwrap()),
        ];
        for (field, mutated) in mutations {
            let f = fixture();
            f.store.save_snapshot(&mutated).await.unwrap();
            f.store.link_wallet(&user, WALLET).await.unwrap();
            anchor(&f, anchored.snapshot_hash, NOW + 3600, 1).await;

            let verdict = f.bridge.verify_trust_snapshot(&user).await.unwrap();
            assert!(!verdict.verified, "changed {} should not verify", field);
            assert_eq!(verdict.reason, Some(VerdictReason::HashMismatch), "{}", field);
            assert_eq!(verdict.onchain_hash, Some(hex::encode(anchored.snapshot_hash)));
        }
    }

    #[tokio::test]
    async fn test_time_only_change_breaks_verification() {
        let f = fixture();
        let (user, snap) = seeded(&f).await;
        anchor(&f, snap.snapshot_hash, NOW + 3600, 1).await;

        let mut moved = snap.clone();
        moved.snapshot_time = snap.snapshot_time + chrono::Duration::milliseconds(1);
        f.store.save_snapshot(&moved).await.unwrap();
        assert!(!f.bridge.verify_trust_snapshot(&user).await.unwrap().verified);
    }

    #[tokio::test]
    async fn test_tampered_stored_hash_is_ignored() {
        let f = fixture();
        let user = Uuid::now_v7();
        let mut snap = snapshot(user);
        let honest = snap.snapshot_hash;
        snap.score = 99;
        f.store.save_snapshot(&snap).await.unwrap();
        f.store.link_wallet(&user, WALLET).await.unwrap();
        anchor(&f, honest, NOW + 3600, 1).await;

        let verdict = f.bridge.verify_trust_snapshot(&user).await.unwrap();
        assert!(!verdict.verified);
    }

    struct FailingStore;

    #[async_trait]
    impl TrustSnapshotStore for FailingStore {
        async fn save_snapshot(&self, _s: &TrustSnapshot) -> Result<(), TrustgateError> {
            Err(TrustgateError::Storage("down".to_string()))
        }
        async fn latest_snapshot(&self, _u: &Uuid) -> Result<Option<TrustSnapshot>, TrustgateError> {
            Err(TrustgateError::Storage("down".to_string()))
        }
        async fn find_by_hash(&self, _h: &[u8; 32]) -> Result<Option<TrustSnapshot>, TrustgateError> {
            Err(TrustgateError::Storage("down".to_string()))
        }
    }

    struct SlowAnchors;

    #[async_trait]
    impl AnchorSource for SlowAnchors {
        async fn get_reputation(&self, _s: &Address) -> Result<Anchor, TrustgateError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Anchor {
                tier: Tier::new(0),
                snapshot_hash: [0; 32],
                expires_at: i64::MAX,
                nonce: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let bridge = VerificationBridge::new(
            Arc::new(FailingStore),
            store,
            Arc::new(SlowAnchors),
            Arc::new(ManualClock::at_unix(NOW)),
        );
        let verdict = bridge.verify_trust_snapshot(&Uuid::now_v7()).await.unwrap();
        assert!(!verdict.verified);
        assert_eq!(verdict.reason, Some(VerdictReason::StoreUnavailable));
        assert!(!bridge.verify_snapshot_hash(&[1; 32]).await.is_valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_anchor_timeout_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::now_v7();
        store.save_snapshot(&snapshot(user)).await.unwrap();
        store.link_wallet(&user, WALLET).await.unwrap();
        let bridge = VerificationBridge::new(
            store.clone(),
            store,
            Arc::new(SlowAnchors),
            Arc::new(ManualClock::at_unix(NOW)),
        )
        .with_timeout(Duration::from_millis(100));

        let verdict = bridge.verify_trust_snapshot(&user).await.unwrap();
        assert!(!verdict.verified);
        assert_eq!(verdict.reason, Some(VerdictReason::AnchorUnavailable));
    }

    #[tokio::test]
    async fn test_hash_lookup() {
        let f = fixture();
        let (_, snap) = seeded(&f).await;
        let found = f.bridge.verify_snapshot_hash(&snap.snapshot_hash).await;
        assert!(found.is_valid);
        assert_eq!(found.snapshot_time, Some(snap.snapshot_time));

        let missing = f.bridge.verify_snapshot_hash(&[0xff; 32]).await;
        assert_eq!(missing, HashLookup::invalid());
    }
}
