// crates/trustgate-escrow/src/token.rs
//
// Native settlement currency amounts.
//
// The smallest unit is the wei. 1 ETH = 10^18 wei. All escrow accounting is
// integer wei; the `Eth` wrapper exists for display and test ergonomics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Number of wei in one ETH.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Type alias for wei, the smallest unit of the settlement currency.
pub type Wei = u128;

/// An amount of the settlement currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Eth {
    pub wei: Wei,
}

impl Eth {
    /// Whole ETH.
    ///
    /// # Example
    /// ```
    /// use trustgate_escrow::token::Eth;
    /// assert_eq!(Eth::from_eth(2).wei, 2_000_000_000_000_000_000);
    /// ```
    pub fn from_eth(amount: u64) -> Self {
        Self {
            wei: amount as u128 * WEI_PER_ETH,
        }
    }

    pub fn from_wei(wei: Wei) -> Self {
        Self { wei }
    }

    pub fn zero() -> Self {
        Self { wei: 0 }
    }
}

/// Shorthand for `Eth::from_eth(amount).wei`.
pub fn eth(amount: u64) -> Wei {
    Eth::from_eth(amount).wei
}

impl Add for Eth {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            wei: self.wei.saturating_add(rhs.wei),
        }
    }
}

impl Sub for Eth {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            wei: self.wei.saturating_sub(rhs.wei),
        }
    }
}

impl fmt::Display for Eth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.wei / WEI_PER_ETH;
        let frac = self.wei % WEI_PER_ETH;
        if frac == 0 {
            write!(f, "{} ETH", whole)
        } else {
            let frac_str = format!("{:018}", frac);
            write!(f, "{}.{} ETH", whole, frac_str.trim_end_matches('0'))
        }
    }
}
