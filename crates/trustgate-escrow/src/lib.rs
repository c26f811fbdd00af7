// crates/trustgate-escrow/src/lib.rs
//
// trustgate-escrow: the tier-gated loan escrow.
//
// A loan moves SUBMITTED -> FUNDED -> ACTIVE -> REPAID. Release to the
// borrower is gated on the borrower's anchored reputation read from the
// registry, never on a self-reported tier. All amounts are tracked in wei.

pub mod escrow;
pub mod events;
pub mod loan;
pub mod token;
pub mod vault;

// Re-export key types for ergonomic access from downstream crates.
pub use escrow::LoanEscrow;
pub use events::EscrowEvent;
pub use loan::{Loan, LoanId, LoanStatus};
pub use token::{eth, Eth, Wei, WEI_PER_ETH};
pub use vault::Vault;
