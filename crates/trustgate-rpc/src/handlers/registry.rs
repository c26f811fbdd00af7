// crates/trustgate-rpc/src/handlers/registry.rs
//
// Registry handlers: SubmitAttestation (relay a signed update), GetAnchor.

use serde::{Deserialize, Serialize};

use trustgate_core::address::Address;
use trustgate_core::attestation::{Anchor, AttestationSignature, AttestationUpdate};
use trustgate_core::encoding::hex32;
use trustgate_core::identity::{Capability, Principal};
use trustgate_core::snapshot::Tier;
use trustgate_registry::RegistryEvent;

use super::{require_capability, ApiContext, ApiError};

// ---------------------------------------------------------------------------
// SubmitAttestation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttestationRequest {
    pub update: AttestationUpdate,
    pub signature: AttestationSignature,
}

/// `POST /api/registry/attestations`
pub async fn handle_submit_attestation(
    ctx: &ApiContext,
    principal: &Principal,
    request: SubmitAttestationRequest,
) -> Result<RegistryEvent, ApiError> {
    require_capability(principal, Capability::SubmitAttestations)?;
    let event = ctx
        .registry
        .update_reputation(&request.update, &request.signature)
        .await?;

    ctx.record_audit(
        principal,
        "registry.submit_attestation",
        "anchor",
        request.update.subject.to_string(),
        serde_json::json!({
            "nonce": request.update.nonce,
            "tier": request.update.tier,
        }),
    )
    .await?;
    Ok(event)
}

// ---------------------------------------------------------------------------
// GetAnchor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorResponse {
    pub subject: Address,
    pub tier: Tier,
    #[serde(with = "hex32")]
    pub snapshot_hash: [u8; 32],
    pub expires_at: i64,
    pub nonce: u64,
    /// False for the zero tuple of a never-anchored subject.
    pub anchored: bool,
}

impl AnchorResponse {
    fn new(subject: Address, anchor: Anchor) -> Self {
        Self {
            subject,
            tier: anchor.tier,
            snapshot_hash: anchor.snapshot_hash,
            expires_at: anchor.expires_at,
            nonce: anchor.nonce,
            anchored: !anchor.is_unset(),
        }
    }
}

/// `GET /api/registry/anchors/:address`
pub async fn handle_get_anchor(
    ctx: &ApiContext,
    _principal: &Principal,
    raw_address: &str,
) -> Result<AnchorResponse, ApiError> {
    let subject: Address = raw_address.parse()?;
    let anchor = ctx.registry.get_reputation(&subject).await;
    Ok(AnchorResponse::new(subject, anchor))
}
