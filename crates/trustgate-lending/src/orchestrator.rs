// crates/trustgate-lending/src/orchestrator.rs
//
// LoanRequestOrchestrator: verification bridge -> policy gate -> persist.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use trustgate_core::clock::Clock;
use trustgate_core::error::TrustgateError;
use trustgate_core::loan_request::{LoanRequestRecord, LoanRequestStatus};
use trustgate_core::traits::LoanRequestStore;
use trustgate_verify::VerificationBridge;

use crate::policy::validate_loan_request;

/// Longest loan term accepted, in days.
pub const MAX_DURATION_DAYS: u32 = 3_650;

pub struct LoanRequestOrchestrator {
    bridge: Arc<VerificationBridge>,
    requests: Arc<dyn LoanRequestStore>,
    clock: Arc<dyn Clock>,
}

impl LoanRequestOrchestrator {
    pub fn new(
        bridge: Arc<VerificationBridge>,
        requests: Arc<dyn LoanRequestStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bridge,
            requests,
            clock,
        }
    }

    /// Gate and persist a loan request.
    ///
    /// # Errors
    /// - `InvalidAmount` / `InvalidRequest` for malformed input.
    /// - `IntegrityMismatch` when the user's snapshot is missing or does not
    ///   reconcile with its anchor.
    /// - `PolicyViolation` when the verified score or tier does not allow it.
    pub async fn create_loan_request(
        &self,
        user_id: Uuid,
        amount: f64,
        duration_days: u32,
    ) -> Result<LoanRequestRecord, TrustgateError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(TrustgateError::InvalidAmount(format!(
                "Loan amount must be a positive number, got {}",
                amount
            )));
        }
        if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
            return Err(TrustgateError::InvalidRequest(format!(
                "Duration must be between 1 and {} days, got {}",
                MAX_DURATION_DAYS, duration_days
            )));
        }

        let snapshot = match self.bridge.verified_snapshot(&user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Loan request rejected: integrity");
                return Err(e);
            }
        };

        if let Err(e) = validate_loan_request(amount, snapshot.tier, snapshot.score) {
            warn!(user_id = %user_id, amount, error = %e, "Loan request rejected: policy");
            return Err(e);
        }

        let record = LoanRequestRecord {
            id: Uuid::now_v7(),
            user_id,
            amount,
            duration_days,
            status: LoanRequestStatus::Approved,
            tier: snapshot.tier,
            score: snapshot.score,
            snapshot_hash: snapshot.snapshot_hash,
            created_at: self.clock.now(),
        };
        self.requests.save_loan_request(&record).await?;

        info!(
            request_id = %record.id,
            user_id = %user_id,
            amount,
            tier = %record.tier,
            "Loan request approved"
        );
        Ok(record)
    }
}
