// crates/trustgate-core/src/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only record of a privileged action (cross-user access, snapshot
/// ingestion, attestation submission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// The authenticated user who performed the action.
    pub actor_id: Uuid,
    /// Action name, e.g. "trust.read_other_user".
    pub action: String,
    /// Kind of resource touched, e.g. "trust_snapshot".
    pub resource_type: String,
    /// Identifier of the resource touched.
    pub resource_id: String,
    /// Free-form context (roles used, request parameters).
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        actor_id: Uuid,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            metadata,
            created_at,
        }
    }
}
