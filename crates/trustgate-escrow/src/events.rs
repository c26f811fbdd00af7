// crates/trustgate-escrow/src/events.rs
//
// Events emitted by the escrow for every accepted state transition.

use serde::{Deserialize, Serialize};

use trustgate_core::address::Address;
use trustgate_core::snapshot::Tier;

use crate::loan::LoanId;
use crate::token::Wei;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEvent {
    LoanSubmitted {
        loan_id: LoanId,
        borrower: Address,
        lender: Address,
        amount: Wei,
        min_tier: Tier,
    },
    LoanFunded {
        loan_id: LoanId,
        lender: Address,
        amount: Wei,
    },
    LoanReleased {
        loan_id: LoanId,
        borrower: Address,
        amount: Wei,
    },
    RepaymentMade {
        loan_id: LoanId,
        payer: Address,
        /// This payment only, not the cumulative total.
        amount: Wei,
        fully_repaid: bool,
    },
}

impl EscrowEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            EscrowEvent::LoanSubmitted { loan_id, .. }
            | EscrowEvent::LoanFunded { loan_id, .. }
            | EscrowEvent::LoanReleased { loan_id, .. }
            | EscrowEvent::RepaymentMade { loan_id, .. } => *loan_id,
        }
    }
}
