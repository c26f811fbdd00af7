// crates/trustgate-rpc/src/handlers/mod.rs
//
// Handler modules for the API routes, plus the shared context, error
// mapping, and access-control helpers they use.

pub mod loans;
pub mod registry;
pub mod trust;
pub mod verification;

use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use trustgate_core::audit::AuditLogEntry;
use trustgate_core::clock::Clock;
use trustgate_core::error::TrustgateError;
use trustgate_core::identity::{Capability, Principal};
use trustgate_core::traits::{AuditSink, LoanRequestStore, TrustSnapshotStore, WalletDirectory};
use trustgate_lending::LoanRequestOrchestrator;
use trustgate_registry::ReputationRegistry;
use trustgate_verify::VerificationBridge;

// ---------------------------------------------------------------------------
// ApiContext
// ---------------------------------------------------------------------------

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub snapshots: Arc<dyn TrustSnapshotStore>,
    pub wallets: Arc<dyn WalletDirectory>,
    pub loan_requests: Arc<dyn LoanRequestStore>,
    pub audit: Arc<dyn AuditSink>,
    pub registry: Arc<ReputationRegistry>,
    pub bridge: Arc<VerificationBridge>,
    pub orchestrator: Arc<LoanRequestOrchestrator>,
    pub clock: Arc<dyn Clock>,
}

impl ApiContext {
    /// Append an audit entry for a privileged action. Failing to audit fails
    /// the request.
    pub async fn record_audit(
        &self,
        actor: &Principal,
        action: &str,
        resource_type: &str,
        resource_id: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<(), ApiError> {
        let entry = AuditLogEntry::new(
            actor.user_id,
            action,
            resource_type,
            resource_id,
            metadata,
            self.clock.now(),
        );
        self.audit.append(&entry).await?;
        tracing::info!(
            actor = %actor.user_id,
            action,
            resource_id = %entry.resource_id,
            "Audit entry recorded"
        );
        Ok(())
    }

    /// Allow self access, or cross-user access with `ReadAnyUser`, auditing
    /// the latter.
    pub async fn authorize_user_access(
        &self,
        principal: &Principal,
        target: &Uuid,
        action: &str,
        resource_type: &str,
    ) -> Result<(), ApiError> {
        if !principal.can_access_user(target) {
            return Err(TrustgateError::Forbidden(format!(
                "Not permitted to access user {}",
                target
            ))
            .into());
        }
        if principal.is_override_for(target) {
            self.record_audit(
                principal,
                action,
                resource_type,
                target.to_string(),
                serde_json::json!({ "roles": principal.roles }),
            )
            .await?;
        }
        Ok(())
    }
}

/// Fail with 403 unless the principal holds `capability`.
pub fn require_capability(principal: &Principal, capability: Capability) -> Result<(), ApiError> {
    if principal.has(capability) {
        Ok(())
    } else {
        Err(TrustgateError::Forbidden(format!("Missing capability {:?}", capability)).into())
    }
}

/// Parse a path segment as a user id.
pub fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| TrustgateError::InvalidRequest(format!("Malformed user id: {}", raw)).into())
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// An error ready to be rendered as `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn rate_limited() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", "Too many requests")
    }

    pub fn not_found_route(path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "ROUTE_NOT_FOUND", format!("No route for {}", path))
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "Method not allowed")
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            format!("Request body exceeds {} bytes", limit),
        )
    }

    pub fn bad_json(e: serde_json::Error) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", format!("Invalid JSON body: {}", e))
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "internal error")
    }

    pub fn to_json(&self) -> Vec<u8> {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        };
        serde_json::to_vec(&body).unwrap_or_default()
    }
}

/// HTTP status for each error variant. Integrity failures are 403 and
/// policy failures 400, so callers can tell "fix the anchor" from "ask
/// for less".
pub fn status_for(error: &TrustgateError) -> StatusCode {
    match error {
        TrustgateError::InvalidAuthoritySignature => StatusCode::FORBIDDEN,
        TrustgateError::NonceNotIncreasing { .. } => StatusCode::CONFLICT,
        TrustgateError::SnapshotExpired { .. } => StatusCode::CONFLICT,
        TrustgateError::TierInsufficient { .. } => StatusCode::FORBIDDEN,
        TrustgateError::Unauthorized(_) => StatusCode::FORBIDDEN,
        TrustgateError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        TrustgateError::InvalidState(_) => StatusCode::CONFLICT,
        TrustgateError::LoanNotFound(_) => StatusCode::NOT_FOUND,
        TrustgateError::SnapshotMissing(_) => StatusCode::NOT_FOUND,
        TrustgateError::IntegrityMismatch(_) => StatusCode::FORBIDDEN,
        TrustgateError::PolicyViolation(_) => StatusCode::BAD_REQUEST,
        TrustgateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        TrustgateError::Forbidden(_) => StatusCode::FORBIDDEN,
        TrustgateError::NotFound(_) => StatusCode::NOT_FOUND,
        TrustgateError::Storage(_)
        | TrustgateError::Crypto(_)
        | TrustgateError::Serialization(_)
        | TrustgateError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<TrustgateError> for ApiError {
    fn from(error: TrustgateError) -> Self {
        if error.is_internal() {
            tracing::error!(error = %error, "Internal error");
            return ApiError::internal();
        }
        ApiError::new(status_for(&error), error.code(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_and_policy_map_differently() {
        let integrity: ApiError = TrustgateError::IntegrityMismatch("x".into()).into();
        let policy: ApiError = TrustgateError::PolicyViolation("x".into()).into();
        assert_eq!(integrity.status, StatusCode::FORBIDDEN);
        assert_eq!(policy.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_nonce_conflict() {
        let err: ApiError = TrustgateError::NonceNotIncreasing { stored: 3, received: 3 }.into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "NONCE_NOT_INCREASING");
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err: ApiError = TrustgateError::Storage("rocksdb: /var/lib/secret corrupted".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal error");
        let body: serde_json::Value = serde_json::from_slice(&err.to_json()).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL");
        assert!(!body.to_string().contains("rocksdb"));
    }

    #[test]
    fn test_malformed_user_id() {
        let err = parse_user_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
