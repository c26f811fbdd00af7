// crates/trustgate-core/src/snapshot.rs

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::encoding::hex32;
use crate::error::TrustgateError;

/// Domain tag prefixed to every canonical snapshot encoding.
pub const SNAPSHOT_HASH_DOMAIN: &[u8] = b"trustgate/snapshot/v1";

/// Upper bound of the trust score scale.
pub const MAX_SCORE: u8 = 100;

/// Ordinal trust classification. Lower is more trusted: tier 0 is the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub u8);

impl Tier {
    pub const fn new(value: u8) -> Self {
        Tier(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether this tier is at least as good as `required`.
    pub fn satisfies(&self, required: Tier) -> bool {
        self.0 <= required.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Off-chain record of one scoring run for a subject.
///
/// Rows are append-only: a newer snapshot supersedes the previous one for
/// reads of "latest" but never overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    /// The platform user the score belongs to.
    pub subject_id: Uuid,
    /// Trust score on a 0..=100 scale.
    pub score: u8,
    /// Risk tier derived by the scoring model.
    pub tier: Tier,
    /// Identifier of the scoring model that produced this row.
    pub model_version: String,
    /// SHA-256 of the feature vector the model consumed.
    #[serde(with = "hex32")]
    pub feature_vector_hash: [u8; 32],
    /// When the scoring run happened (millisecond precision).
    pub snapshot_time: DateTime<Utc>,
    /// Canonical hash over the fields above, computed on construction.
    #[serde(with = "hex32")]
    pub snapshot_hash: [u8; 32],
}

impl TrustSnapshot {
    /// Build a snapshot row, validating the score range and pinning the
    /// timestamp to millisecond precision before hashing.
    pub fn new(
        subject_id: Uuid,
        score: u8,
        tier: Tier,
        model_version: impl Into<String>,
        feature_vector_hash: [u8; 32],
        snapshot_time: DateTime<Utc>,
    ) -> Result<Self, TrustgateError> {
        if score > MAX_SCORE {
            return Err(TrustgateError::InvalidRequest(format!(
                "Score {} exceeds maximum of {}",
                score, MAX_SCORE
            )));
        }
        let model_version = model_version.into();
        if model_version.is_empty() {
            return Err(TrustgateError::InvalidRequest(
                "model_version must not be empty".to_string(),
            ));
        }
        let snapshot_time = snapshot_time.trunc_subsecs(3);
        let hash = snapshot_hash(score, tier, &model_version, &feature_vector_hash, &snapshot_time);

        Ok(Self {
            subject_id,
            score,
            tier,
            model_version,
            feature_vector_hash,
            snapshot_time,
            snapshot_hash: hash,
        })
    }

    /// Recompute the canonical hash from the row's fields.
    ///
    /// The stored `snapshot_hash` is not trusted by the bridge; it always
    /// recomputes.
    pub fn compute_hash(&self) -> [u8; 32] {
        snapshot_hash(
            self.score,
            self.tier,
            &self.model_version,
            &self.feature_vector_hash,
            &self.snapshot_time,
        )
    }
}

/// Canonical snapshot hash.
///
/// SHA-256 over:
///   SNAPSHOT_HASH_DOMAIN
///   score                 1 byte
///   tier                  1 byte
///   len(model_version)    u32 big-endian
///   model_version         UTF-8 bytes
///   feature_vector_hash   32 bytes
///   snapshot_time         i64 big-endian Unix milliseconds
///
/// The scorer anchors exactly this value, so any change here is a
/// protocol version bump.
pub fn snapshot_hash(
    score: u8,
    tier: Tier,
    model_version: &str,
    feature_vector_hash: &[u8; 32],
    snapshot_time: &DateTime<Utc>,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SNAPSHOT_HASH_DOMAIN);
    hasher.update([score]);
    hasher.update([tier.value()]);
    hasher.update((model_version.len() as u32).to_be_bytes());
    hasher.update(model_version.as_bytes());
    hasher.update(feature_vector_hash);
    hasher.update(snapshot_time.timestamp_millis().to_be_bytes());
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_snapshot() -> TrustSnapshot {
        TrustSnapshot::new(
            Uuid::now_v7(),
            72,
            Tier::new(1),
            "risk-v3.2",
            [9u8; 32],
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let s = base_snapshot();
        assert_eq!(s.snapshot_hash, s.compute_hash());
        assert_eq!(s.compute_hash(), s.clone().compute_hash());
    }

    #[test]
    fn test_each_field_changes_hash() {
        let s = base_snapshot();
        let h = s.compute_hash();

        let mut m = s.clone();
        m.score = 73;
        assert_ne!(m.compute_hash(), h);

        let mut m = s.clone();
        m.tier = Tier::new(2);
        assert_ne!(m.compute_hash(), h);

        let mut m = s.clone();
        m.model_version = "risk-v3.3".to_string();
        assert_ne!(m.compute_hash(), h);

        let mut m = s.clone();
        m.feature_vector_hash[0] ^= 1;
        assert_ne!(m.compute_hash(), h);

        let mut m = s.clone();
        m.snapshot_time = m.snapshot_time + chrono::Duration::seconds(1);
        assert_ne!(m.compute_hash(), h);
    }

    #[test]
    fn test_subject_id_is_not_hashed() {
        let s = base_snapshot();
        let mut other = s.clone();
        other.subject_id = Uuid::now_v7();
        assert_eq!(s.compute_hash(), other.compute_hash());
    }

    #[test]
    fn test_model_version_length_prefix_prevents_ambiguity() {
        // "ab" + score byte vs "a" + shifted bytes must not collide.
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = snapshot_hash(1, Tier::new(1), "ab", &[0u8; 32], &t);
        let b = snapshot_hash(1, Tier::new(1), "a", &[0u8; 32], &t);
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_truncates_to_millis() {
        let t = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let s = TrustSnapshot::new(Uuid::now_v7(), 50, Tier::new(0), "m", [0u8; 32], t).unwrap();
        assert_eq!(s.snapshot_time.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_new_rejects_out_of_range_score() {
        let result = TrustSnapshot::new(Uuid::now_v7(), 101, Tier::new(0), "m", [0u8; 32], Utc::now());
        assert!(matches!(result, Err(TrustgateError::InvalidRequest(_))));
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::new(0).satisfies(Tier::new(2)));
        assert!(Tier::new(2).satisfies(Tier::new(2)));
        assert!(!Tier::new(3).satisfies(Tier::new(2)));
    }
}
