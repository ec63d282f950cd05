//! HTTP routes for the payments service.
//!
//! Defines the Axum router and application state.

use crate::auth::{ClaimRules, KeyResolver, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::gateway::PaymentGateway;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Upper bound for handling one request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Payment provider client.
    pub gateway: Arc<dyn PaymentGateway>,
}

/// Build the auth middleware state from configuration.
///
/// The key resolver starts empty; call `KeyResolver::init` on
/// `state.verifier.key_resolver()` to warm it.
pub fn build_auth_state(config: &Config) -> Arc<AuthState> {
    let key_resolver = Arc::new(KeyResolver::new(
        config.auth_jwks_url.clone(),
        config.jwks_cache_ttl,
        config.jwks_fetch_timeout,
    ));
    let verifier = Arc::new(TokenVerifier::new(
        key_resolver,
        ClaimRules {
            issuer: config.auth_issuer.clone(),
            audiences: config.auth_audiences.clone(),
            clock_skew: config.jwt_clock_skew,
        },
        config.auth_algorithms.clone(),
    ));
    Arc::new(AuthState::new(
        verifier,
        config.auth_excluded_paths.clone(),
    ))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/ping` - Liveness probe - allow-listed
/// - `/metrics` - Prometheus metrics endpoint - allow-listed
/// - `/customer`, `/customer/:customer_id` - Customer management
/// - `/subscription`, `/subscription/:subscription_id` - Subscriptions
/// - `/client-token`, `/client-token/:customer_id` - SDK client tokens
///
/// Authentication wraps the whole router rather than a protected subset:
/// only paths in `auth_state.excluded_paths` skip it, so unknown paths are
/// 401 rather than 404 for anonymous callers.
pub fn build_routes(
    state: Arc<AppState>,
    auth_state: Arc<AuthState>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let public_routes = Router::new().route("/ping", get(handlers::ping));

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let resource_routes = Router::new()
        .route("/customer", post(handlers::create_customer))
        .route(
            "/customer/:customer_id",
            get(handlers::get_customer).delete(handlers::delete_customer),
        )
        .route("/subscription", post(handlers::create_subscription))
        .route(
            "/subscription/:subscription_id",
            get(handlers::get_subscription).delete(handlers::cancel_subscription),
        )
        .route("/client-token", get(handlers::generate_client_token))
        .route(
            "/client-token/:customer_id",
            get(handlers::generate_customer_client_token),
        )
        .with_state(state);

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. require_auth - Verify bearer token unless allow-listed (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. TraceLayer - Log request details
    // 4. PropagateRequestIdLayer - Echo x-request-id on the response
    // 5. SetRequestIdLayer - Assign x-request-id when absent
    // 6. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(resource_routes)
        .layer(middleware::from_fn_with_state(auth_state, require_auth))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn(http_metrics_middleware))
}
