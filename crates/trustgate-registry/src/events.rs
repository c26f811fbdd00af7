// crates/trustgate-registry/src/events.rs
//
// Events published by the registry on a tokio broadcast channel.

use serde::{Deserialize, Serialize};

use trustgate_core::address::Address;
use trustgate_core::encoding::hex32;
use trustgate_core::snapshot::Tier;

/// Emitted once per accepted update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    ReputationUpdated {
        subject: Address,
        tier: Tier,
        #[serde(with = "hex32")]
        snapshot_hash: [u8; 32],
        expires_at: i64,
        nonce: u64,
        /// Address recovered from the accepted signature.
        signer: Address,
    },
}
