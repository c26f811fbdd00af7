use thiserror::Error;

use crate::snapshot::Tier;

/// Error taxonomy shared by the registry, escrow, bridge, and lending crates.
#[derive(Debug, Error)]
pub enum TrustgateError {
    /// The attestation signature did not verify, or was produced by a key
    /// other than the configured authority.
    #[error("Invalid authority signature")]
    InvalidAuthoritySignature,

    /// The update's nonce is not strictly greater than the anchored nonce.
    #[error("Nonce not increasing: stored {stored}, received {received}")]
    NonceNotIncreasing { stored: u64, received: u64 },

    /// The anchored reputation has expired (or was never anchored).
    #[error("Snapshot expired at {expires_at} (now {now})")]
    SnapshotExpired { expires_at: i64, now: i64 },

    /// The borrower's anchored tier is worse than the loan requires.
    #[error("Tier insufficient: loan requires tier {required} or better, borrower has tier {actual}")]
    TierInsufficient { required: Tier, actual: Tier },

    /// Caller is not permitted to perform this escrow operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Amount is zero, negative, non-finite, or does not match the obligation.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No loan with the given id exists in the escrow.
    #[error("Loan not found: {0}")]
    LoanNotFound(u64),

    /// No off-chain snapshot exists for the subject.
    #[error("Snapshot missing: {0}")]
    SnapshotMissing(String),

    /// The off-chain snapshot could not be reconciled with its on-chain anchor.
    #[error("Integrity mismatch: {0}")]
    IntegrityMismatch(String),

    /// Score floor or amount cap violated.
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Malformed input that is not an amount problem.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authenticated caller lacks the capability for this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage layer error (RocksDB, lock poisoning).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cryptographic error (malformed keys or signatures).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A dependency (chain read, store) did not answer in time.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl TrustgateError {
    /// Stable, machine-readable error code exposed to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            TrustgateError::InvalidAuthoritySignature => "INVALID_AUTHORITY_SIGNATURE",
            TrustgateError::NonceNotIncreasing { .. } => "NONCE_NOT_INCREASING",
            TrustgateError::SnapshotExpired { .. } => "SNAPSHOT_EXPIRED",
            TrustgateError::TierInsufficient { .. } => "TIER_INSUFFICIENT",
            TrustgateError::Unauthorized(_) => "UNAUTHORIZED",
            TrustgateError::InvalidAmount(_) => "INVALID_AMOUNT",
            TrustgateError::InvalidState(_) => "INVALID_STATE",
            TrustgateError::LoanNotFound(_) => "LOAN_NOT_FOUND",
            TrustgateError::SnapshotMissing(_) => "SNAPSHOT_MISSING",
            TrustgateError::IntegrityMismatch(_) => "INTEGRITY_MISMATCH",
            TrustgateError::PolicyViolation(_) => "POLICY_VIOLATION",
            TrustgateError::InvalidRequest(_) => "INVALID_REQUEST",
            TrustgateError::Forbidden(_) => "FORBIDDEN",
            TrustgateError::NotFound(_) => "NOT_FOUND",
            TrustgateError::Storage(_) => "STORAGE_ERROR",
            TrustgateError::Crypto(_) => "CRYPTO_ERROR",
            TrustgateError::Serialization(_) => "SERIALIZATION_ERROR",
            TrustgateError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Whether the error originates inside the service rather than from the
    /// caller's input. Internal errors never expose their message to callers.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            TrustgateError::Storage(_)
                | TrustgateError::Crypto(_)
                | TrustgateError::Serialization(_)
                | TrustgateError::Unavailable(_)
        )
    }
}

impl From<serde_json::Error> for TrustgateError {
    fn from(e: serde_json::Error) -> Self {
        TrustgateError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for TrustgateError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        TrustgateError::Crypto(e.to_string())
    }
}
