// crates/trustgate-lending/src/policy.rs
//
// Tier -> loan cap lookup and the request policy gate.

use serde::{Deserialize, Serialize};

use trustgate_core::error::TrustgateError;
use trustgate_core::snapshot::Tier;

/// Scores below this receive no capital regardless of tier.
pub const MINIMUM_SCORE: u8 = 20;

/// Caps applied to loan requests of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanPolicy {
    /// Largest principal a single request may ask for.
    pub max_amount: f64,
    /// Maximum loan-to-value ratio. Not enforced yet; reserved for
    /// collateral-bearing loan types.
    pub max_ltv: f64,
}

/// Fixed policy table. Any tier past 1 gets the most conservative row.
pub fn policy_for_tier(tier: Tier) -> LoanPolicy {
    match tier.value() {
        0 => LoanPolicy {
            max_amount: 5_000.0,
            max_ltv: 0.8,
        },
        1 => LoanPolicy {
            max_amount: 2_000.0,
            max_ltv: 0.6,
        },
        _ => LoanPolicy {
            max_amount: 500.0,
            max_ltv: 0.4,
        },
    }
}

/// Check a request against the score floor and the tier's amount cap.
pub fn validate_loan_request(amount: f64, tier: Tier, score: u8) -> Result<LoanPolicy, TrustgateError> {
    if score < MINIMUM_SCORE {
        return Err(TrustgateError::PolicyViolation(format!(
            "Trust score {} is below minimum {} for any capital allocation",
            score, MINIMUM_SCORE
        )));
    }
    let policy = policy_for_tier(tier);
    if amount > policy.max_amount {
        return Err(TrustgateError::PolicyViolation(format!(
            "Amount {:.2} exceeds tier {} maximum of {:.2}",
            amount, tier, policy.max_amount
        )));
    }
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_zero_cap_boundary() {
        assert!(validate_loan_request(5_000.0, Tier::new(0), 80).is_ok());
        assert!(matches!(
            validate_loan_request(5_000.01, Tier::new(0), 80),
            Err(TrustgateError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_score_floor_boundary() {
        assert!(validate_loan_request(100.0, Tier::new(0), 20).is_ok());
        assert!(matches!(
            validate_loan_request(100.0, Tier::new(0), 19),
            Err(TrustgateError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_unknown_tiers_use_conservative_row() {
        assert_eq!(policy_for_tier(Tier::new(2)), policy_for_tier(Tier::new(7)));
        assert_eq!(policy_for_tier(Tier::new(255)).max_amount, 500.0);
    }

    #[test]
    fn test_caps_shrink_as_tier_worsens() {
        let caps: Vec<f64> = (0..4).map(|t| policy_for_tier(Tier::new(t)).max_amount).collect();
        assert!(caps.windows(2).all(|w| w[0] >= w[1]));
    }
}
