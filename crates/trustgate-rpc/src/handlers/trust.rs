// crates/trustgate-rpc/src/handlers/trust.rs
//
// Trust snapshot handlers: GetTrust, IngestSnapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustgate_core::address::Address;
use trustgate_core::encoding::decode_fixed;
use trustgate_core::error::TrustgateError;
use trustgate_core::identity::{Capability, Principal};
use trustgate_core::snapshot::{Tier, TrustSnapshot};
use trustgate_core::traits::{TrustSnapshotStore, WalletDirectory};

use super::{parse_user_id, require_capability, ApiContext, ApiError};

// ---------------------------------------------------------------------------
// GetTrust
// ---------------------------------------------------------------------------

/// Latest trust snapshot of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustResponse {
    pub trust_score: u8,
    pub risk_tier: Tier,
    pub snapshot_time: DateTime<Utc>,
    pub model_version: String,
    /// Hex SHA-256 of the model's feature vector.
    pub feature_vector_hash: String,
}

/// `GET /api/users/:user_id/trust`
pub async fn handle_get_trust(
    ctx: &ApiContext,
    principal: &Principal,
    raw_user_id: &str,
) -> Result<TrustResponse, ApiError> {
    let user_id = parse_user_id(raw_user_id)?;
    ctx.authorize_user_access(principal, &user_id, "trust.read_other_user", "trust_snapshot")
        .await?;

    let snapshot = ctx
        .snapshots
        .latest_snapshot(&user_id)
        .await?
        .ok_or_else(|| TrustgateError::NotFound(format!("No trust snapshot for user {}", user_id)))?;

    Ok(TrustResponse {
        trust_score: snapshot.score,
        risk_tier: snapshot.tier,
        snapshot_time: snapshot.snapshot_time,
        model_version: snapshot.model_version,
        feature_vector_hash: hex::encode(snapshot.feature_vector_hash),
    })
}

// ---------------------------------------------------------------------------
// IngestSnapshot
// ---------------------------------------------------------------------------

/// A scoring run pushed by the scorer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSnapshotRequest {
    pub score: u8,
    pub tier: Tier,
    pub model_version: String,
    /// Hex SHA-256 of the model's feature vector.
    pub feature_vector_hash: String,
    /// Defaults to the server's current time.
    #[serde(default)]
    pub snapshot_time: Option<DateTime<Utc>>,
    /// Link (or relink) the user's wallet in the same call.
    #[serde(default)]
    pub wallet_address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSnapshotResponse {
    pub user_id: String,
    /// Canonical hash the authority must anchor.
    pub snapshot_hash: String,
    pub snapshot_time: DateTime<Utc>,
}

/// `POST /api/users/:user_id/trust`
pub async fn handle_ingest_snapshot(
    ctx: &ApiContext,
    principal: &Principal,
    raw_user_id: &str,
    request: IngestSnapshotRequest,
) -> Result<IngestSnapshotResponse, ApiError> {
    require_capability(principal, Capability::WriteSnapshots)?;
    let user_id = parse_user_id(raw_user_id)?;
    let feature_vector_hash = decode_fixed::<32>(&request.feature_vector_hash)?;

    let snapshot = TrustSnapshot::new(
        user_id,
        request.score,
        request.tier,
        request.model_version,
        feature_vector_hash,
        request.snapshot_time.unwrap_or_else(|| ctx.clock.now()),
    )?;
    if request.wallet_address.is_some_and(|w| w.is_zero()) {
        return Err(TrustgateError::InvalidRequest("Wallet address must not be zero".to_string()).into());
    }

    ctx.snapshots.save_snapshot(&snapshot).await?;
    if let Some(wallet) = request.wallet_address {
        ctx.wallets.link_wallet(&user_id, wallet).await?;
    }

    let snapshot_hash = hex::encode(snapshot.snapshot_hash);
    ctx.record_audit(
        principal,
        "trust.ingest_snapshot",
        "trust_snapshot",
        user_id.to_string(),
        serde_json::json!({
            "snapshot_hash": snapshot_hash,
            "model_version": snapshot.model_version,
            "wallet_address": request.wallet_address,
        }),
    )
    .await?;

    Ok(IngestSnapshotResponse {
        user_id: user_id.to_string(),
        snapshot_hash,
        snapshot_time: snapshot.snapshot_time,
    })
}
