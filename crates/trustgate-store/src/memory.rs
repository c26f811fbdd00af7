// crates/trustgate-store/src/memory.rs
//
// In-memory store implementing every Trustgate storage trait.
//
// Used by tests and by the daemon's `storage = "memory"` mode. Semantics
// match RocksStore: snapshot rows are append-only, "latest" is the row with
// the newest snapshot time, and the audit log keeps insertion order.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use trustgate_core::address::Address;
use trustgate_core::audit::AuditLogEntry;
use trustgate_core::error::TrustgateError;
use trustgate_core::loan_request::LoanRequestRecord;
use trustgate_core::snapshot::TrustSnapshot;
use trustgate_core::traits::{AuditSink, LoanRequestStore, TrustSnapshotStore, WalletDirectory};

#[derive(Debug, Default)]
struct Tables {
    /// Every snapshot row per subject, in arrival order.
    snapshots: HashMap<Uuid, Vec<TrustSnapshot>>,
    wallets: HashMap<Uuid, Address>,
    loan_requests: Vec<LoanRequestRecord>,
    audit: Vec<AuditLogEntry>,
}

/// In-memory store backed by a single `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, TrustgateError> {
        self.tables
            .read()
            .map_err(|_| TrustgateError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, TrustgateError> {
        self.tables
            .write()
            .map_err(|_| TrustgateError::Storage("memory store lock poisoned".to_string()))
    }

    /// Number of snapshot rows stored for a subject (all versions).
    pub fn snapshot_count(&self, subject_id: &Uuid) -> usize {
        self.read()
            .map(|t| t.snapshots.get(subject_id).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl TrustSnapshotStore for MemoryStore {
    async fn save_snapshot(&self, snapshot: &TrustSnapshot) -> Result<(), TrustgateError> {
        self.write()?
            .snapshots
            .entry(snapshot.subject_id)
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self, subject_id: &Uuid) -> Result<Option<TrustSnapshot>, TrustgateError> {
        let tables = self.read()?;
        // Ties go to the later arrival, matching RocksStore's pointer update.
        let latest = tables.snapshots.get(subject_id).and_then(|rows| {
            rows.iter()
                .enumerate()
                .max_by_key(|(i, s)| (s.snapshot_time, *i))
                .map(|(_, s)| s.clone())
        });
        Ok(latest)
    }

    async fn find_by_hash(&self, hash: &[u8; 32]) -> Result<Option<TrustSnapshot>, TrustgateError> {
        let tables = self.read()?;
        Ok(tables
            .snapshots
            .values()
            .flatten()
            .find(|s| &s.snapshot_hash == hash)
            .cloned())
    }
}

#[async_trait]
impl WalletDirectory for MemoryStore {
    async fn link_wallet(&self, user_id: &Uuid, wallet: Address) -> Result<(), TrustgateError> {
        self.write()?.wallets.insert(*user_id, wallet);
        Ok(())
    }

    async fn wallet_for(&self, user_id: &Uuid) -> Result<Option<Address>, TrustgateError> {
        Ok(self.read()?.wallets.get(user_id).copied())
    }
}

#[async_trait]
impl LoanRequestStore for MemoryStore {
    async fn save_loan_request(&self, record: &LoanRequestRecord) -> Result<(), TrustgateError> {
        let mut tables = self.write()?;
        match tables.loan_requests.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => tables.loan_requests.push(record.clone()),
        }
        Ok(())
    }

    async fn get_loan_request(&self, id: &Uuid) -> Result<Option<LoanRequestRecord>, TrustgateError> {
        Ok(self
            .read()?
            .loan_requests
            .iter()
            .find(|r| r.id == *id)
            .cloned())
    }

    async fn list_loan_requests(&self, user_id: &Uuid) -> Result<Vec<LoanRequestRecord>, TrustgateError> {
        Ok(self
            .read()?
            .loan_requests
            .iter()
            .filter(|r| r.user_id == *user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), TrustgateError> {
        self.write()?.audit.push(entry.clone());
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<AuditLogEntry>, TrustgateError> {
        Ok(self.read()?.audit.clone())
    }
}
