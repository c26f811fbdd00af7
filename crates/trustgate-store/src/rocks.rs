// crates/trustgate-store/src/rocks.rs
//
// RocksDB-backed persistent storage.
//
// Key format:
//   - Snapshot row:     `snapshot:{subject}:{millis:020}:{row_uuid}` -> JSON TrustSnapshot
//   - Latest pointer:   `latest:{subject}` -> snapshot row key
//   - Hash index:       `hash:{hex}` -> snapshot row key
//   - Wallet link:      `wallet:{user}` -> address string
//   - Loan request:     `loanreq:{uuid}` -> JSON LoanRequestRecord
//   - Per-user index:   `loanreq_user:{user}:{uuid}` -> empty value (index only)
//   - Audit entry:      `audit:{uuid_v7}` -> JSON AuditLogEntry
//
// Snapshot rows are never overwritten: the row key embeds a fresh UUID, and
// the latest pointer only moves forward in snapshot time.

use std::sync::Mutex;

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use uuid::Uuid;

use trustgate_core::address::Address;
use trustgate_core::audit::AuditLogEntry;
use trustgate_core::error::TrustgateError;
use trustgate_core::loan_request::LoanRequestRecord;
use trustgate_core::snapshot::TrustSnapshot;
use trustgate_core::traits::{AuditSink, LoanRequestStore, TrustSnapshotStore, WalletDirectory};

/// RocksDB wrapper implementing every Trustgate storage trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
    /// Serializes the read-compare-write of the latest snapshot pointer.
    snapshot_write: Mutex<()>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, TrustgateError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            TrustgateError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        Ok(Self {
            db,
            snapshot_write: Mutex::new(()),
        })
    }

    fn snapshot_row_key(snapshot: &TrustSnapshot) -> Vec<u8> {
        let millis = snapshot.snapshot_time.timestamp_millis().max(0);
        format!(
            "snapshot:{}:{:020}:{}",
            snapshot.subject_id,
            millis,
            Uuid::now_v7()
        )
        .into_bytes()
    }

    fn latest_key(subject_id: &Uuid) -> Vec<u8> {
        format!("latest:{}", subject_id).into_bytes()
    }

    fn hash_key(hash: &[u8; 32]) -> Vec<u8> {
        format!("hash:{}", hex::encode(hash)).into_bytes()
    }

    fn wallet_key(user_id: &Uuid) -> Vec<u8> {
        format!("wallet:{}", user_id).into_bytes()
    }

    fn loan_request_key(id: &Uuid) -> Vec<u8> {
        format!("loanreq:{}", id).into_bytes()
    }

    fn loan_request_user_key(user_id: &Uuid, id: &Uuid) -> Vec<u8> {
        format!("loanreq_user:{}:{}", user_id, id).into_bytes()
    }

    fn audit_key(id: &Uuid) -> Vec<u8> {
        format!("audit:{}", id).into_bytes()
    }

    /// Put raw bytes into RocksDB, mapping errors to TrustgateError::Storage.
    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), TrustgateError> {
        self.db
            .put(key, value)
            .map_err(|e| TrustgateError::Storage(format!("RocksDB put failed: {}", e)))
    }

    /// Get raw bytes from RocksDB, mapping errors to TrustgateError::Storage.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrustgateError> {
        self.db
            .get(key)
            .map_err(|e| TrustgateError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), TrustgateError> {
        self.db
            .write(batch)
            .map_err(|e| TrustgateError::Storage(format!("RocksDB batch write failed: {}", e)))
    }

    /// Collect every key with the given prefix, in key order.
    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, TrustgateError> {
        let mut keys = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, _value) = item
                .map_err(|e| TrustgateError::Storage(format!("RocksDB iteration error: {}", e)))?;
            // prefix_iterator seeks to the prefix but does not stop at its end.
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Follow a pointer value (a row key) to the snapshot it names.
    fn snapshot_at(&self, row_key: &[u8]) -> Result<Option<TrustSnapshot>, TrustgateError> {
        match self.get_raw(row_key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn latest_snapshot_sync(&self, subject_id: &Uuid) -> Result<Option<TrustSnapshot>, TrustgateError> {
        match self.get_raw(&Self::latest_key(subject_id))? {
            Some(row_key) => self.snapshot_at(&row_key),
            None => Ok(None),
        }
    }

    pub fn save_snapshot_sync(&self, snapshot: &TrustSnapshot) -> Result<(), TrustgateError> {
        let _guard = self
            .snapshot_write
            .lock()
            .map_err(|_| TrustgateError::Storage("snapshot write lock poisoned".to_string()))?;

        let row_key = Self::snapshot_row_key(snapshot);
        let json = serde_json::to_vec(snapshot)?;

        let mut batch = WriteBatch::default();
        batch.put(&row_key, &json);
        batch.put(Self::hash_key(&snapshot.snapshot_hash), &row_key);

        let advances = match self.latest_snapshot_sync(&snapshot.subject_id)? {
            Some(current) => snapshot.snapshot_time >= current.snapshot_time,
            None => true,
        };
        if advances {
            batch.put(Self::latest_key(&snapshot.subject_id), &row_key);
        } else {
            tracing::debug!(
                subject = %snapshot.subject_id,
                "Stored out-of-order snapshot; latest pointer unchanged"
            );
        }

        self.write_batch(batch)
    }

    /// Number of snapshot rows stored for a subject (all versions).
    pub fn snapshot_count(&self, subject_id: &Uuid) -> Result<usize, TrustgateError> {
        let prefix = format!("snapshot:{}:", subject_id);
        Ok(self.keys_with_prefix(prefix.as_bytes())?.len())
    }
}

#[async_trait]
impl TrustSnapshotStore for RocksStore {
    async fn save_snapshot(&self, snapshot: &TrustSnapshot) -> Result<(), TrustgateError> {
        self.save_snapshot_sync(snapshot)
    }

    async fn latest_snapshot(&self, subject_id: &Uuid) -> Result<Option<TrustSnapshot>, TrustgateError> {
        self.latest_snapshot_sync(subject_id)
    }

    async fn find_by_hash(&self, hash: &[u8; 32]) -> Result<Option<TrustSnapshot>, TrustgateError> {
        match self.get_raw(&Self::hash_key(hash))? {
            Some(row_key) => self.snapshot_at(&row_key),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WalletDirectory for RocksStore {
    async fn link_wallet(&self, user_id: &Uuid, wallet: Address) -> Result<(), TrustgateError> {
        self.put_raw(&Self::wallet_key(user_id), wallet.to_string().as_bytes())
    }

    async fn wallet_for(&self, user_id: &Uuid) -> Result<Option<Address>, TrustgateError> {
        match self.get_raw(&Self::wallet_key(user_id))? {
            Some(bytes) => {
                let text = std::str::from_utf8(&bytes).map_err(|e| {
                    TrustgateError::Serialization(format!("Corrupt wallet entry: {}", e))
                })?;
                let address = text.parse::<Address>().map_err(|e| {
                    TrustgateError::Serialization(format!("Corrupt wallet entry: {}", e))
                })?;
                Ok(Some(address))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LoanRequestStore for RocksStore {
    async fn save_loan_request(&self, record: &LoanRequestRecord) -> Result<(), TrustgateError> {
        let json = serde_json::to_vec(record)?;
        let mut batch = WriteBatch::default();
        batch.put(Self::loan_request_key(&record.id), &json);
        // Secondary index (empty value; existence is the signal).
        batch.put(Self::loan_request_user_key(&record.user_id, &record.id), b"");
        self.write_batch(batch)
    }

    async fn get_loan_request(&self, id: &Uuid) -> Result<Option<LoanRequestRecord>, TrustgateError> {
        match self.get_raw(&Self::loan_request_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_loan_requests(&self, user_id: &Uuid) -> Result<Vec<LoanRequestRecord>, TrustgateError> {
        let prefix = format!("loanreq_user:{}:", user_id);
        let mut records = Vec::new();
        for key in self.keys_with_prefix(prefix.as_bytes())? {
            let id_str = std::str::from_utf8(&key[prefix.len()..]).unwrap_or("");
            if let Ok(id) = Uuid::parse_str(id_str) {
                if let Some(record) = self.get_loan_request(&id).await? {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl AuditSink for RocksStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), TrustgateError> {
        let json = serde_json::to_vec(entry)?;
        self.put_raw(&Self::audit_key(&entry.id), &json)
    }

    async fn entries(&self) -> Result<Vec<AuditLogEntry>, TrustgateError> {
        let mut entries = Vec::new();
        for key in self.keys_with_prefix(b"audit:")? {
            if let Some(bytes) = self.get_raw(&key)? {
                entries.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use trustgate_core::loan_request::LoanRequestStatus;
    use trustgate_core::snapshot::Tier;

    fn temp_db_path(label: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("trustgate_test_{}_{}", label, Uuid::now_v7()));
        path.to_string_lossy().to_string()
    }

    fn snapshot(subject: Uuid, score: u8, offset_secs: i64) -> TrustSnapshot {
        let t = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
        TrustSnapshot::new(subject, score, Tier::new(1), "risk-v1", [4u8; 32], t).unwrap()
    }

    #[tokio::test]
    async fn test_latest_snapshot_tracks_newest_time() {
        let store = RocksStore::open(&temp_db_path("latest")).unwrap();
        let subject = Uuid::now_v7();

        store.save_snapshot(&snapshot(subject, 60, 10)).await.unwrap();
        store.save_snapshot(&snapshot(subject, 70, 20)).await.unwrap();
        // Out-of-order arrival of an older row must not move the pointer back.
        store.save_snapshot(&snapshot(subject, 50, 5)).await.unwrap();

        let latest = store.latest_snapshot(&subject).await.unwrap().unwrap();
        assert_eq!(latest.score, 70);
        assert_eq!(store.snapshot_count(&subject).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_by_hash() {
        let store = RocksStore::open(&temp_db_path("hash")).unwrap();
        let s = snapshot(Uuid::now_v7(), 80, 0);
        store.save_snapshot(&s).await.unwrap();

        let found = store.find_by_hash(&s.snapshot_hash).await.unwrap().unwrap();
        assert_eq!(found, s);
        assert!(store.find_by_hash(&[0u8; 32]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_subject_returns_none() {
        let store = RocksStore::open(&temp_db_path("missing")).unwrap();
        assert!(store.latest_snapshot(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wallet_link() {
        let store = RocksStore::open(&temp_db_path("wallet")).unwrap();
        let user = Uuid::now_v7();
        assert!(store.wallet_for(&user).await.unwrap().is_none());
        store.link_wallet(&user, Address([5u8; 20])).await.unwrap();
        assert_eq!(store.wallet_for(&user).await.unwrap(), Some(Address([5u8; 20])));
    }

    #[tokio::test]
    async fn test_loan_requests_listed_per_user() {
        let store = RocksStore::open(&temp_db_path("loanreq")).unwrap();
        let user = Uuid::now_v7();
        let other = Uuid::now_v7();

        for (owner, amount) in [(user, 100.0), (other, 200.0), (user, 300.0)] {
            let record = LoanRequestRecord {
                id: Uuid::now_v7(),
                user_id: owner,
                amount,
                duration_days: 30,
                status: LoanRequestStatus::Approved,
                tier: Tier::new(0),
                score: 90,
                snapshot_hash: [1u8; 32],
                created_at: Utc::now(),
            };
            store.save_loan_request(&record).await.unwrap();
        }

        let mine = store.list_loan_requests(&user).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].amount, 100.0);
        assert_eq!(mine[1].amount, 300.0);
    }

    #[tokio::test]
    async fn test_audit_entries_in_order() {
        let store = RocksStore::open(&temp_db_path("audit")).unwrap();
        let actor = Uuid::now_v7();
        for action in ["first", "second"] {
            let entry = AuditLogEntry::new(actor, action, "trust_snapshot", "x", serde_json::json!({}), Utc::now());
            store.append(&entry).await.unwrap();
        }
        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "first");
        assert_eq!(entries[1].action, "second");
    }
}
