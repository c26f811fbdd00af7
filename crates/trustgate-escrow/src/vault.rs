// crates/trustgate-escrow/src/vault.rs
//
// Settlement vault for the escrow.
//
// The escrow holds funded principal in `held` until release. Released
// principal and repayments are credited to the recipient's withdrawable
// balance, mirroring a pull-payment contract.

use std::collections::HashMap;

use trustgate_core::address::Address;
use trustgate_core::error::TrustgateError;

use crate::token::Wei;

#[derive(Debug, Default)]
pub struct Vault {
    /// Funds held by the escrow on behalf of funded, unreleased loans.
    held: Wei,
    /// Withdrawable balances per address.
    balances: HashMap<Address, Wei>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take custody of funds sent with a funding call.
    pub fn deposit(&mut self, amount: Wei) {
        self.held = self.held.saturating_add(amount);
    }

    /// Move held funds to a recipient's withdrawable balance.
    ///
    /// # Errors
    /// Returns `TrustgateError::InvalidState` if the vault holds less than `amount`.
    pub fn release_to(&mut self, recipient: Address, amount: Wei) -> Result<(), TrustgateError> {
        if amount > self.held {
            return Err(TrustgateError::InvalidState(format!(
                "Insufficient escrow balance: requested {} wei but only {} wei held",
                amount, self.held
            )));
        }
        self.held -= amount;
        self.credit(recipient, amount);
        Ok(())
    }

    /// Credit a payment passed straight through to a recipient.
    pub fn credit(&mut self, recipient: Address, amount: Wei) {
        let balance = self.balances.entry(recipient).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Withdraw from an address's balance.
    ///
    /// # Errors
    /// Returns `TrustgateError::InvalidAmount` if `amount` is zero or exceeds
    /// the balance; the balance is unchanged in that case.
    pub fn withdraw(&mut self, owner: &Address, amount: Wei) -> Result<Wei, TrustgateError> {
        if amount == 0 {
            return Err(TrustgateError::InvalidAmount(
                "Withdrawal amount must be greater than zero".to_string(),
            ));
        }
        let balance = self.balances.get(owner).copied().unwrap_or(0);
        if amount > balance {
            return Err(TrustgateError::InvalidAmount(format!(
                "Insufficient balance: requested {} wei but only {} wei available",
                amount, balance
            )));
        }
        let remaining = balance - amount;
        if remaining == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, remaining);
        }
        Ok(remaining)
    }

    pub fn balance_of(&self, owner: &Address) -> Wei {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn held(&self) -> Wei {
        self.held
    }
}
