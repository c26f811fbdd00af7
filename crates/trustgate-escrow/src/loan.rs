// crates/trustgate-escrow/src/loan.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use trustgate_core::address::Address;
use trustgate_core::snapshot::Tier;

use crate::token::Wei;

/// Sequential loan identifier assigned by the escrow, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(pub u64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Escrow lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Submitted,
    Funded,
    Active,
    Repaid,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Submitted => "SUBMITTED",
            LoanStatus::Funded => "FUNDED",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Repaid => "REPAID",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower: Address,
    /// The account that submitted the loan. Only it may fund or release.
    pub lender: Address,
    /// Principal in wei.
    pub amount: Wei,
    /// Worst tier the borrower may hold at release time.
    pub min_tier: Tier,
    pub status: LoanStatus,
    pub funded_amount: Wei,
    /// Cumulative repayments. Never exceeds `amount`.
    pub repaid_amount: Wei,
}

impl Loan {
    pub fn outstanding(&self) -> Wei {
        self.amount.saturating_sub(self.repaid_amount)
    }

    pub fn is_fully_funded(&self) -> bool {
        self.funded_amount == self.amount
    }
}
