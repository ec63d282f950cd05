//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is allow-listed so Prometheus can scrape it without a
//! token. Metrics carry no subjects, customer IDs or token material; labels
//! have bounded cardinality.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping:
/// ```text
/// # TYPE payments_auth_rejections_total counter
/// payments_auth_rejections_total{kind="signature_invalid",status_code="401"} 3
/// ```
#[tracing::instrument(skip_all, name = "payments.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
