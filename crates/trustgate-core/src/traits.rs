// crates/trustgate-core/src/traits.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::address::Address;
use crate::attestation::Anchor;
use crate::audit::AuditLogEntry;
use crate::error::TrustgateError;
use crate::loan_request::LoanRequestRecord;
use crate::snapshot::TrustSnapshot;

/// Durable, append-only record of scoring snapshots.
///
/// Implemented by trustgate-store (RocksDB and in-memory backends).
#[async_trait]
pub trait TrustSnapshotStore: Send + Sync {
    /// Append a snapshot. Never overwrites an earlier row.
    async fn save_snapshot(&self, snapshot: &TrustSnapshot) -> Result<(), TrustgateError>;

    /// The most recent snapshot (by `snapshot_time`) for a subject.
    async fn latest_snapshot(&self, subject_id: &Uuid) -> Result<Option<TrustSnapshot>, TrustgateError>;

    /// Look up a snapshot by its canonical hash.
    async fn find_by_hash(&self, hash: &[u8; 32]) -> Result<Option<TrustSnapshot>, TrustgateError>;
}

/// Maps platform users to the wallet address their anchors are keyed by.
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    async fn link_wallet(&self, user_id: &Uuid, wallet: Address) -> Result<(), TrustgateError>;

    async fn wallet_for(&self, user_id: &Uuid) -> Result<Option<Address>, TrustgateError>;
}

/// Persistence for approved loan requests.
#[async_trait]
pub trait LoanRequestStore: Send + Sync {
    async fn save_loan_request(&self, record: &LoanRequestRecord) -> Result<(), TrustgateError>;

    async fn get_loan_request(&self, id: &Uuid) -> Result<Option<LoanRequestRecord>, TrustgateError>;

    /// All requests for a user, oldest first.
    async fn list_loan_requests(&self, user_id: &Uuid) -> Result<Vec<LoanRequestRecord>, TrustgateError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), TrustgateError>;

    /// Entries in insertion order.
    async fn entries(&self) -> Result<Vec<AuditLogEntry>, TrustgateError>;
}

/// Read access to anchored reputation.
///
/// Implemented by trustgate-registry. Consumers (escrow, bridge) never write.
#[async_trait]
pub trait AnchorSource: Send + Sync {
    /// The current anchor for a subject, or the zero tuple if never anchored.
    async fn get_reputation(&self, subject: &Address) -> Result<Anchor, TrustgateError>;
}
