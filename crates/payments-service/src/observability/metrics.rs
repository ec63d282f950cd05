//! Metrics definitions for the payments service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `payments_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: route templates only, unknown paths collapse to `/other`
//! - `kind`: auth failure kinds (8 values)
//! - `operation`: bounded by the payment gateway trait methods
//! - `status`: small fixed sets per metric

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("payments_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("payments_jwks_fetch".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("payments_gateway_request".to_string()),
            &[
                0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set gateway request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `payments_http_requests_total`, `payments_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including auth rejections and
/// framework-level errors (404, 405, 415, 422).
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("payments_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("payments_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces customer and subscription IDs with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/ping" | "/metrics" | "/customer" | "/subscription" | "/client-token" => {
            return path.to_string();
        }
        _ => {}
    }

    let parts: Vec<&str> = path.split('/').collect();
    if let [_, resource, id] = parts.as_slice() {
        if !id.is_empty() {
            match *resource {
                "customer" => return "/customer/{customer_id}".to_string(),
                "subscription" => return "/subscription/{subscription_id}".to_string(),
                "client-token" => return "/client-token/{customer_id}".to_string(),
                _ => {}
            }
        }
    }

    // Unknown paths normalized to "/other" to bound cardinality
    "/other".to_string()
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a request rejected by the auth middleware.
///
/// Metric: `payments_auth_rejections_total`
/// Labels: `kind`, `status_code`
///
/// `status_code` keeps credential failures (401) apart from auth
/// infrastructure outages (503).
pub fn record_auth_rejection(kind: &str, status_code: u16) {
    counter!("payments_auth_rejections_total",
        "kind" => kind.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record a JWKS fetch.
///
/// Metric: `payments_jwks_fetch_duration_seconds`, `payments_jwks_fetches_total`
/// Labels: `status` ("success", "error")
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("payments_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("payments_jwks_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the cache state found by a key lookup.
///
/// Metric: `payments_jwks_lookups_total`
/// Labels: `result` ("hit", "miss", "stale", "empty")
pub fn record_jwks_lookup(result: &str) {
    counter!("payments_jwks_lookups_total",
        "result" => result.to_string()
    )
    .increment(1);
}

// ============================================================================
// Payment Gateway Metrics
// ============================================================================

/// Record a payment provider call.
///
/// Metric: `payments_gateway_request_duration_seconds`, `payments_gateway_requests_total`
/// Labels: `operation`, `status` ("success", "not_found", "rejected", "error")
pub fn record_gateway_request(operation: &str, status: &str, duration: Duration) {
    histogram!("payments_gateway_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("payments_gateway_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
