// crates/trustgate-core/src/lib.rs
//
// trustgate-core: Core types, traits, and crypto primitives for Trustgate.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the snapshot and attestation data model, the canonical hash
// encodings that both sides of the off-chain/on-chain seam must agree on,
// the error taxonomy, role capabilities, and the storage trait interfaces.

pub mod address;
pub mod attestation;
pub mod audit;
pub mod clock;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod loan_request;
pub mod snapshot;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use trustgate_core::TrustSnapshot;`

// Addressing
pub use address::Address;

// Attestation types
pub use attestation::{Anchor, AttestationSignature, AttestationUpdate, RegistryDomain};

// Snapshot types
pub use snapshot::{snapshot_hash, Tier, TrustSnapshot, MAX_SCORE};

// Audit and loan request records
pub use audit::AuditLogEntry;
pub use loan_request::{LoanRequestRecord, LoanRequestStatus};

// Identity and roles
pub use identity::{Capability, Principal, Role};

// Time
pub use clock::{Clock, ManualClock, SystemClock};

// Error type
pub use error::TrustgateError;

// Traits
pub use traits::{AnchorSource, AuditSink, LoanRequestStore, TrustSnapshotStore, WalletDirectory};
