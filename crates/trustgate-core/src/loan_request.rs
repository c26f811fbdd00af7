// crates/trustgate-core/src/loan_request.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encoding::hex32;
use crate::snapshot::Tier;

/// Status of a persisted loan request.
///
/// Approval is automatic once integrity and policy gates pass, so requests
/// are only ever persisted as `Approved`. Rejected requests are not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanRequestStatus {
    Approved,
}

/// A loan request accepted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequestRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Requested principal in the platform's fiat unit.
    pub amount: f64,
    pub duration_days: u32,
    pub status: LoanRequestStatus,
    /// Tier and score of the verified snapshot the request was gated on.
    pub tier: Tier,
    pub score: u8,
    #[serde(with = "hex32")]
    pub snapshot_hash: [u8; 32],
    pub created_at: DateTime<Utc>,
}
