// crates/trustgate-rpc/src/lib.rs
//
// trustgate-rpc: HTTP/JSON API server and handlers for Trustgate.
//
// Serves the `/api` routes over tonic's transport with HTTP/1.1 enabled.
// Requests are authenticated with bearer tokens, rate limited per client,
// routed by method and path, and answered with JSON bodies.

pub mod handlers;
pub mod middleware;
pub mod server;

// Re-export the main server types for ergonomic access.
pub use handlers::{ApiContext, ApiError};
pub use middleware::{Authenticator, PrincipalConfig, RateLimitConfig, RateLimiter};
pub use server::{ApiServer, RpcConfig};
