// crates/trustgate-registry/src/lib.rs
//
// trustgate-registry: the reputation anchor registry.
//
// Holds one (tier, snapshot_hash, expires_at, nonce) tuple per wallet address.
// Only updates signed by the configured attestation authority are accepted,
// and each subject's nonce must strictly increase. The escrow and the
// verification bridge read anchors through `trustgate_core::AnchorSource`.

pub mod events;
pub mod registry;

pub use events::RegistryEvent;
pub use registry::ReputationRegistry;
