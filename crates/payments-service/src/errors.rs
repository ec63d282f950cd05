//! Payments service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use crate::auth::AuthError;
use crate::services::gateway::GatewayError;
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "payments-api";

/// Payments service error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthenticated: 401, or 503 when the auth service is unavailable
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict (provider rejected the operation)
/// - BadRequest: 400 Bad Request
/// - UnprocessableEntity: 422 Unprocessable Entity
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(AuthError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthenticated(e) => e.status_code(),
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::BadRequest(_) => 400,
            ApiError::UnprocessableEntity(_) => 422,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// `WWW-Authenticate` challenge for a 401 (RFC 6750 section 3).
fn bearer_challenge(err: AuthError) -> String {
    match err {
        // No credentials presented: no error code
        AuthError::MissingHeader => format!("Bearer realm=\"{AUTH_REALM}\""),
        AuthError::MalformedHeader => {
            format!("Bearer realm=\"{AUTH_REALM}\", error=\"invalid_request\"")
        }
        _ => format!("Bearer realm=\"{AUTH_REALM}\", error=\"invalid_token\""),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (code, message) = match &self {
            ApiError::Unauthenticated(err) => (err.code(), err.client_message().to_string()),
            ApiError::Forbidden(reason) => ("FORBIDDEN", reason.clone()),
            ApiError::NotFound(resource) => ("NOT_FOUND", resource.clone()),
            ApiError::Conflict(reason) => ("CONFLICT", reason.clone()),
            ApiError::BadRequest(reason) => ("BAD_REQUEST", reason.clone()),
            ApiError::UnprocessableEntity(reason) => ("UNPROCESSABLE_ENTITY", reason.clone()),
            ApiError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "payments.availability", reason = %reason, "Service unavailable");
                (
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if let ApiError::Unauthenticated(err) = &self {
            if status == StatusCode::UNAUTHORIZED {
                if let Ok(header_value) = HeaderValue::from_str(&bearer_challenge(*err)) {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, header_value);
                }
            }
        }

        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthenticated(err)
    }
}

/// Convert payment gateway errors to ApiError.
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(resource) => ApiError::NotFound(format!("{resource} not found")),
            GatewayError::Rejected { operation, message } => {
                tracing::info!(
                    target: "payments.services.gateway",
                    operation = %operation,
                    provider_message = %message,
                    "Payment provider rejected operation"
                );
                ApiError::Conflict(format!("The payment provider rejected {operation}"))
            }
            GatewayError::Unavailable(reason) => ApiError::ServiceUnavailable(reason),
        }
    }
}

/// Map JSON body extraction failures: syntax errors are 400, schema
/// violations (missing or unknown fields, wrong types) are 422.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(target: "payments.handlers", error = %rejection.body_text(), "Request body rejected");
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::UnprocessableEntity(e.body_text()),
            JsonRejection::JsonSyntaxError(_) => {
                ApiError::BadRequest("Request body is not valid JSON".to_string())
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest("Expected 'Content-Type: application/json'".to_string())
            }
            _ => ApiError::BadRequest("Request body could not be read".to_string()),
        }
    }
}
