// crates/trustgate-rpc/src/server.rs
//
// API server setup: ApiServer and RpcConfig.
//
// Uses tonic's transport with HTTP/1.1 enabled and a single hand-written
// service registered under the name "api", so tonic routes every `/api/*`
// request to it. The service does its own method/path routing and answers
// with plain JSON bodies and real HTTP status codes.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use http::{Method, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tonic::transport::Server;
use tonic::Status;

use trustgate_core::error::TrustgateError;
use trustgate_core::identity::Principal;

use crate::handlers::{self, ApiContext, ApiError};
use crate::middleware::{self, Authenticator, RateLimitConfig, RateLimiter};

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    pub rate_limit: RateLimitConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: 64 * 1024,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiServer
// ---------------------------------------------------------------------------

/// The HTTP API server.
pub struct ApiServer {
    config: RpcConfig,
    service: TrustgateApiService,
}

impl std::fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiServer")
            .field("config", &self.config)
            .field("principals", &self.service.inner.auth.len())
            .finish()
    }
}

impl ApiServer {
    pub fn new(config: RpcConfig, ctx: ApiContext, auth: Authenticator) -> Self {
        let inner = ServiceInner {
            ctx,
            auth,
            limiter: RateLimiter::new(config.rate_limit),
            max_body_bytes: config.max_body_bytes,
        };
        Self {
            config,
            service: TrustgateApiService {
                inner: Arc::new(inner),
            },
        }
    }

    /// The routed service, for embedding or for driving requests in tests.
    pub fn service(&self) -> TrustgateApiService {
        self.service.clone()
    }

    /// Bind and serve until the process is terminated.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Bind and serve until `signal` resolves.
    pub async fn serve_with_shutdown(
        &self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Trustgate API server starting on {}", addr);

        Server::builder()
            .accept_http1(true)
            .add_service(self.service.clone())
            .serve_with_shutdown(addr, signal)
            .await?;

        tracing::info!("Trustgate API server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// A matched API route with its path parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    GetTrust(&'a str),
    IngestSnapshot(&'a str),
    VerifyUser(&'a str),
    VerifyHash,
    CreateLoanRequest,
    ListLoanRequests(&'a str),
    SubmitAttestation,
    GetAnchor(&'a str),
}

fn match_route<'a>(method: &Method, path: &'a str) -> Result<Route<'a>, ApiError> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let route = match segments[..] {
        ["api", "users", id, "trust"] => match *method {
            Method::GET => Route::GetTrust(id),
            Method::POST => Route::IngestSnapshot(id),
            _ => return Err(ApiError::method_not_allowed()),
        },
        ["api", "verification", "user", id] => only(method, Method::GET, Route::VerifyUser(id))?,
        ["api", "verification", "hash"] => only(method, Method::POST, Route::VerifyHash)?,
        ["api", "loans", "request"] => only(method, Method::POST, Route::CreateLoanRequest)?,
        ["api", "loans", "user", id] => only(method, Method::GET, Route::ListLoanRequests(id))?,
        ["api", "registry", "attestations"] => {
            only(method, Method::POST, Route::SubmitAttestation)?
        }
        ["api", "registry", "anchors", address] => {
            only(method, Method::GET, Route::GetAnchor(address))?
        }
        _ => return Err(ApiError::not_found_route(path)),
    };
    Ok(route)
}

fn only<'a>(method: &Method, allowed: Method, route: Route<'a>) -> Result<Route<'a>, ApiError> {
    if *method == allowed {
        Ok(route)
    } else {
        Err(ApiError::method_not_allowed())
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct ServiceInner {
    ctx: ApiContext,
    auth: Authenticator,
    limiter: RateLimiter,
    max_body_bytes: usize,
}

/// The tonic service. Registered under "api" so it receives `/api/*`.
#[derive(Clone)]
pub struct TrustgateApiService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for TrustgateApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustgateApiService").finish()
    }
}

impl tonic::server::NamedService for TrustgateApiService {
    const NAME: &'static str = "api";
}

impl ServiceInner {
    async fn process<B>(
        &self,
        method: &Method,
        path: &str,
        authorization: Option<&str>,
        body: B,
    ) -> Result<(StatusCode, Vec<u8>), ApiError>
    where
        B: HttpBody + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        B::Data: Send,
    {
        // Authenticate before rate limiting so unresolved tokens all drain
        // the same bucket.
        let principal = match self.auth.authenticate(authorization) {
            Ok(principal) => principal,
            Err(err) => {
                if !self.limiter.check(&middleware::client_key(None)) {
                    return Err(ApiError::rate_limited());
                }
                return Err(err);
            }
        };
        if !self.limiter.check(&middleware::client_key(Some(&principal))) {
            return Err(ApiError::rate_limited());
        }
        let route = match_route(method, path)?;

        let body = if *method == Method::POST {
            collect_body(body, self.max_body_bytes).await?
        } else {
            Vec::new()
        };
        self.dispatch(route, &principal, &body).await
    }

    async fn dispatch(
        &self,
        route: Route<'_>,
        principal: &Principal,
        body: &[u8],
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let ctx = &self.ctx;
        match route {
            Route::GetTrust(id) => {
                to_json(StatusCode::OK, handlers::trust::handle_get_trust(ctx, principal, id).await?)
            }
            Route::IngestSnapshot(id) => {
                let request = parse_json(body)?;
                let resp = handlers::trust::handle_ingest_snapshot(ctx, principal, id, request).await?;
                to_json(StatusCode::CREATED, resp)
            }
            Route::VerifyUser(id) => to_json(
                StatusCode::OK,
                handlers::verification::handle_verify_user(ctx, principal, id).await?,
            ),
            Route::VerifyHash => {
                let request = parse_json(body)?;
                to_json(
                    StatusCode::OK,
                    handlers::verification::handle_verify_hash(ctx, principal, request).await?,
                )
            }
            Route::CreateLoanRequest => {
                let request = parse_json(body)?;
                to_json(
                    StatusCode::CREATED,
                    handlers::loans::handle_create_loan_request(ctx, principal, request).await?,
                )
            }
            Route::ListLoanRequests(id) => to_json(
                StatusCode::OK,
                handlers::loans::handle_list_loan_requests(ctx, principal, id).await?,
            ),
            Route::SubmitAttestation => {
                let request = parse_json(body)?;
                to_json(
                    StatusCode::OK,
                    handlers::registry::handle_submit_attestation(ctx, principal, request).await?,
                )
            }
            Route::GetAnchor(address) => to_json(
                StatusCode::OK,
                handlers::registry::handle_get_anchor(ctx, principal, address).await?,
            ),
        }
    }
}

/// Deserialize a JSON body. An empty body reads as `{}`.
fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(ApiError::bad_json)
}

fn to_json<T: Serialize>(status: StatusCode, value: T) -> Result<(StatusCode, Vec<u8>), ApiError> {
    let json = serde_json::to_vec(&value).map_err(TrustgateError::from)?;
    Ok((status, json))
}

impl<B> tower_service::Service<http::Request<B>> for TrustgateApiService
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let started = Instant::now();
            let (parts, body) = req.into_parts();
            let path = parts.uri.path().to_string();
            let authorization = parts
                .headers
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            let (status, json) = match inner
                .process(&parts.method, &path, authorization, body)
                .await
            {
                Ok(ok) => ok,
                Err(e) => (e.status, e.to_json()),
            };

            middleware::log_request(&parts.method, &path, status, started.elapsed());
            Ok(build_response(status, json))
        })
    }
}

/// Collect a request body, refusing anything over `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Vec<u8>, ApiError>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    loop {
        match std::future::poll_fn(|cx| HttpBody::poll_frame(body.as_mut(), cx)).await {
            Some(Ok(frame)) => {
                if let Ok(mut data) = frame.into_data() {
                    use bytes::Buf;
                    let len = data.remaining();
                    if collected.len() + len > limit {
                        return Err(ApiError::payload_too_large(limit));
                    }
                    collected.extend_from_slice(&data.copy_to_bytes(len));
                }
            }
            Some(Err(e)) => {
                let message = format!("Failed to read request body: {}", e.into());
                return Err(ApiError::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message));
            }
            None => break,
        }
    }

    Ok(collected)
}

/// Build an HTTP response with the given status and JSON body.
fn build_response(status: StatusCode, json: Vec<u8>) -> http::Response<tonic::body::BoxBody> {
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}
