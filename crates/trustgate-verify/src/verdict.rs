// crates/trustgate-verify/src/verdict.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a snapshot did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// The snapshot store failed or timed out.
    StoreUnavailable,
    /// The user has no linked wallet, so there is nothing to reconcile against.
    WalletNotLinked,
    /// The wallet directory failed or timed out.
    WalletUnavailable,
    /// The anchor read failed or timed out.
    AnchorUnavailable,
    /// The wallet was never anchored.
    NotAnchored,
    /// The recomputed snapshot hash differs from the anchored hash.
    HashMismatch,
    /// The anchor's `expires_at` has passed.
    AnchorExpired,
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerdictReason::StoreUnavailable => "snapshot store unavailable",
            VerdictReason::WalletNotLinked => "no wallet linked",
            VerdictReason::WalletUnavailable => "wallet directory unavailable",
            VerdictReason::AnchorUnavailable => "anchor read unavailable",
            VerdictReason::NotAnchored => "wallet never anchored",
            VerdictReason::HashMismatch => "snapshot hash does not match anchor",
            VerdictReason::AnchorExpired => "anchor expired",
        };
        f.write_str(s)
    }
}

/// Result of reconciling a user's latest snapshot with its anchor.
///
/// Hashes are hex-encoded. Either hash is `None` when the bridge could not
/// obtain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustVerdict {
    pub verified: bool,
    pub local_hash: Option<String>,
    pub onchain_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<VerdictReason>,
}

impl TrustVerdict {
    pub(crate) fn verified(local: &[u8; 32], onchain: &[u8; 32]) -> Self {
        Self {
            verified: true,
            local_hash: Some(hex::encode(local)),
            onchain_hash: Some(hex::encode(onchain)),
            reason: None,
        }
    }

    pub(crate) fn rejected(
        reason: VerdictReason,
        local: Option<&[u8; 32]>,
        onchain: Option<&[u8; 32]>,
    ) -> Self {
        Self {
            verified: false,
            local_hash: local.map(hex::encode),
            onchain_hash: onchain.map(hex::encode),
            reason: Some(reason),
        }
    }
}

/// Result of a direct hash lookup against the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashLookup {
    pub is_valid: bool,
    pub snapshot_time: Option<DateTime<Utc>>,
}

impl HashLookup {
    pub(crate) fn invalid() -> Self {
        Self {
            is_valid: false,
            snapshot_time: None,
        }
    }
}
