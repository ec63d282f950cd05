//! Authentication middleware.
//!
//! Runs the token verifier on every request whose path is not allow-listed
//! and injects the verified claims into request extensions.

use crate::auth::{TokenClaims, TokenVerifier};
use crate::errors::ApiError;
use crate::observability::metrics::record_auth_rejection;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Header carrying the request id set by the request-id layer.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier with its key resolver.
    pub verifier: Arc<TokenVerifier>,

    /// Paths served without a token (exact match).
    pub excluded_paths: Arc<[String]>,
}

impl AuthState {
    pub fn new(verifier: Arc<TokenVerifier>, excluded_paths: Vec<String>) -> Self {
        Self {
            verifier,
            excluded_paths: excluded_paths.into(),
        }
    }

    /// Whether `path` bypasses authentication.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|excluded| excluded == path)
    }
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Allow-listed paths pass through untouched
/// - 401 with `WWW-Authenticate` when the token is missing or invalid
/// - 503 when signing keys cannot be obtained
/// - Otherwise continues with `TokenClaims` in request extensions
#[instrument(skip_all, name = "payments.middleware.auth", fields(path = %req.uri().path()))]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.is_excluded(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let decision = state
        .verifier
        .decide(req.headers().get(header::AUTHORIZATION))
        .await;

    match decision.into_result() {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(reason) => {
            let request_id = req
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("-");
            let status_code = reason.status_code();

            if reason.is_retryable() {
                tracing::warn!(
                    target: "payments.middleware.auth",
                    kind = reason.kind(),
                    status_code,
                    request_id,
                    "Request rejected: authentication unavailable"
                );
            } else {
                tracing::info!(
                    target: "payments.middleware.auth",
                    kind = reason.kind(),
                    status_code,
                    request_id,
                    "Request rejected: authentication failed"
                );
            }
            record_auth_rejection(reason.kind(), status_code);

            Err(ApiError::Unauthenticated(reason))
        }
    }
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Get the authenticated claims from request extensions.
    ///
    /// Returns `None` if auth middleware did not run for this request.
    fn claims(&self) -> Option<&TokenClaims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&TokenClaims> {
        self.extensions().get::<TokenClaims>()
    }
}
