//! HTTP metrics middleware.
//!
//! Records every response, including those produced before a handler runs:
//! - 401/503 from the auth middleware
//! - 400/415/422 from body extraction
//! - 404 Not Found
//! - 405 Method Not Allowed
//! - 408 from the request timeout layer

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records HTTP request metrics for all responses
///
/// Captures method, normalized path, status code and duration. Applied as
/// the outermost layer so auth rejections and framework errors are counted.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
