//! Liveness handler.

use crate::models::PingResponse;
use axum::Json;

/// Handler for GET /ping
///
/// Always 200 while the process serves requests. Allow-listed, so no token
/// is needed.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse::ok())
}
