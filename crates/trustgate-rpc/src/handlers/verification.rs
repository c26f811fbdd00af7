// crates/trustgate-rpc/src/handlers/verification.rs
//
// Verification handlers: VerifyUser (full bridge reconciliation) and
// VerifyHash (direct store lookup).

use serde::{Deserialize, Serialize};

use trustgate_core::encoding::decode_fixed;
use trustgate_core::error::TrustgateError;
use trustgate_core::identity::Principal;
use trustgate_verify::{HashLookup, TrustVerdict};

use super::{parse_user_id, ApiContext, ApiError};

/// `GET /api/verification/user/:user_id`
pub async fn handle_verify_user(
    ctx: &ApiContext,
    principal: &Principal,
    raw_user_id: &str,
) -> Result<TrustVerdict, ApiError> {
    let user_id = parse_user_id(raw_user_id)?;
    ctx.authorize_user_access(principal, &user_id, "verification.read_other_user", "trust_snapshot")
        .await?;
    Ok(ctx.bridge.verify_trust_snapshot(&user_id).await?)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyHashRequest {
    /// Hex snapshot hash, with or without `0x`.
    #[serde(default)]
    pub snapshot_hash: Option<String>,
}

/// `POST /api/verification/hash`
pub async fn handle_verify_hash(
    ctx: &ApiContext,
    _principal: &Principal,
    request: VerifyHashRequest,
) -> Result<HashLookup, ApiError> {
    let raw = request
        .snapshot_hash
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| TrustgateError::InvalidRequest("snapshot_hash is required".to_string()))?;
    let hash = decode_fixed::<32>(raw.trim())?;
    Ok(ctx.bridge.verify_snapshot_hash(&hash).await)
}
