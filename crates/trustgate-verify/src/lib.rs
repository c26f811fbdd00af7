// crates/trustgate-verify/src/lib.rs
//
// trustgate-verify: the verification bridge.
//
// Reconciles the latest off-chain trust snapshot for a user with the anchor
// the registry holds for the user's linked wallet. The verdict is binary and
// fail-closed: any missing, stale, or unreadable input yields `verified=false`.

pub mod bridge;
pub mod verdict;

// Re-export key types for ergonomic access from downstream crates.
pub use bridge::{VerificationBridge, DEFAULT_BRIDGE_TIMEOUT};
pub use verdict::{HashLookup, TrustVerdict, VerdictReason};
