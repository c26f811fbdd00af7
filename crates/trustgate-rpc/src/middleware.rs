// crates/trustgate-rpc/src/middleware.rs
//
// Middleware for the API server: bearer-token authentication, a per-client
// token-bucket rate limiter, and request logging.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use trustgate_core::encoding::decode_fixed;
use trustgate_core::error::TrustgateError;
use trustgate_core::identity::{Principal, Role};

use crate::handlers::ApiError;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// One configured API caller. Only the SHA-256 of the bearer token is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalConfig {
    /// Hex SHA-256 of the bearer token.
    pub token_sha256: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Resolves `Authorization: Bearer <token>` headers to principals.
#[derive(Debug, Default)]
pub struct Authenticator {
    tokens: HashMap<[u8; 32], Principal>,
}

impl Authenticator {
    pub fn from_principals(principals: &[PrincipalConfig]) -> Result<Self, TrustgateError> {
        let mut tokens = HashMap::with_capacity(principals.len());
        for p in principals {
            let digest = decode_fixed::<32>(&p.token_sha256)?;
            let roles = if p.roles.is_empty() {
                vec![Role::User]
            } else {
                p.roles.clone()
            };
            tokens.insert(digest, Principal::new(p.user_id, roles));
        }
        Ok(Self { tokens })
    }

    /// Register a token directly (tests and embedded use).
    pub fn insert_token(&mut self, token: &str, principal: Principal) {
        self.tokens.insert(token_digest(token), principal);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Authenticate from the raw `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Principal, ApiError> {
        let token = header
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;
        self.tokens
            .get(&token_digest(token))
            .cloned()
            .ok_or_else(|| ApiError::unauthenticated("Invalid bearer token"))
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub fn token_digest(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second per client.
    pub max_rps: u32,
    /// Bucket capacity.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_rps: 50,
            burst: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token-bucket rate limiter keyed by client.
///
/// Buckets idle for longer than `IDLE_EVICTION` are dropped on the next
/// check so the map does not grow without bound.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

const IDLE_EVICTION: Duration = Duration::from_secs(300);

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `client`. Returns false when the bucket is empty.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> bool {
        let capacity = f64::from(self.config.burst.max(1));
        let rate = f64::from(self.config.max_rps);

        // A poisoned lock means a panic mid-update; refusing is the safe answer.
        let Ok(mut buckets) = self.buckets.lock() else {
            return false;
        };
        buckets.retain(|_, b| now.saturating_duration_since(b.refilled_at) < IDLE_EVICTION);

        let bucket = buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: capacity,
            refilled_at: now,
        });
        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Rate-limit key for a request: the authenticated caller's user id, or one
/// shared bucket for every request whose token did not resolve. Only
/// configured principals get their own bucket, so the map stays bounded.
pub fn client_key(principal: Option<&Principal>) -> String {
    match principal {
        Some(p) => format!("user:{}", p.user_id),
        None => UNAUTHENTICATED_KEY.to_string(),
    }
}

pub const UNAUTHENTICATED_KEY: &str = "unauthenticated";

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log a completed request.
pub fn log_request(method: &http::Method, path: &str, status: http::StatusCode, elapsed: Duration) {
    if status.is_server_error() {
        tracing::error!(%method, path, status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "API request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, path, status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "API request rejected");
    } else {
        tracing::info!(%method, path, status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "API request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_authenticate_by_token_digest() {
        let user = Uuid::now_v7();
        let config = PrincipalConfig {
            token_sha256: hex::encode(token_digest("s3cret")),
            user_id: user,
            roles: vec![Role::RiskOfficer],
        };
        let auth = Authenticator::from_principals(&[config]).unwrap();

        let principal = auth.authenticate(Some("Bearer s3cret")).unwrap();
        assert_eq!(principal.user_id, user);
        assert!(principal.roles.contains(&Role::RiskOfficer));

        assert_eq!(auth.authenticate(Some("Bearer wrong")).unwrap_err().status, 401);
        assert_eq!(auth.authenticate(None).unwrap_err().status, 401);
    }

    #[test]
    fn test_principal_without_roles_is_user() {
        let config = PrincipalConfig {
            token_sha256: hex::encode(token_digest("t")),
            user_id: Uuid::now_v7(),
            roles: vec![],
        };
        let auth = Authenticator::from_principals(&[config]).unwrap();
        let principal = auth.authenticate(Some("Bearer t")).unwrap();
        assert_eq!(principal.roles.len(), 1);
        assert!(principal.roles.contains(&Role::User));
    }

    #[test]
    fn test_bad_token_digest_rejected() {
        let config = PrincipalConfig {
            token_sha256: "nothex".to_string(),
            user_id: Uuid::now_v7(),
            roles: vec![],
        };
        assert!(Authenticator::from_principals(&[config]).is_err());
    }

    #[test]
    fn test_bucket_exhausts_and_refills() {
        let limiter = RateLimiter::new(RateLimitConfig { max_rps: 2, burst: 3 });
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("a", t0));
        assert!(!limiter.check_at("a", t0));

        // Other clients have their own bucket.
        assert!(limiter.check_at("b", t0));

        // Half a second at 2 rps refills one token.
        let t1 = t0 + Duration::from_millis(500);
        assert!(limiter.check_at("a", t1));
        assert!(!limiter.check_at("a", t1));
    }

    #[test]
    fn test_client_key() {
        let user = Principal::new(Uuid::now_v7(), vec![Role::User]);
        assert_eq!(client_key(None), UNAUTHENTICATED_KEY);
        assert_eq!(client_key(Some(&user)), format!("user:{}", user.user_id));
        assert_eq!(client_key(Some(&user)), client_key(Some(&user.clone())));
    }

    #[test]
    fn test_invalid_tokens_share_one_bucket() {
        let auth = Authenticator::default();
        let limiter = RateLimiter::new(RateLimitConfig { max_rps: 1, burst: 1 });
        let t0 = Instant::now();

        let allowed = (0..1000)
            .filter(|i| {
                let header = format!("Bearer junk-{}", i);
                let principal = auth.authenticate(Some(&header)).ok();
                limiter.check_at(&client_key(principal.as_ref()), t0)
            })
            .count();
        assert_eq!(allowed, 1);
        assert_eq!(limiter.bucket_count(), 1);
    }
}
