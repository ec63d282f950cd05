//! Authentication failure taxonomy.
//!
//! Every stage of the verification pipeline fails with exactly one
//! [`AuthError`] variant. Infrastructure faults (JWKS unreachable) map to
//! 503 and are kept apart from credential faults (401) in logs, metrics and
//! responses.

use std::fmt;
use thiserror::Error;

/// The claim that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimKind {
    /// `sub` missing or not a string.
    Subject,
    /// `iss` missing or not the expected issuer.
    Issuer,
    /// `aud` missing or contains none of the expected audiences.
    Audience,
    /// `exp` missing, mistyped, or not strictly in the future.
    Expiry,
    /// `iat` mistyped or too far in the future.
    IssuedAt,
}

impl ClaimKind {
    /// The registered claim name.
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::Subject => "sub",
            ClaimKind::Issuer => "iss",
            ClaimKind::Audience => "aud",
            ClaimKind::Expiry => "exp",
            ClaimKind::IssuedAt => "iat",
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication failure.
///
/// Display strings are for server-side logs. Clients only ever see
/// [`AuthError::code`] and [`AuthError::client_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header is not a single bearer token")]
    MalformedHeader,

    #[error("Token is not a well-formed JWT")]
    MalformedToken,

    #[error("Signing key not found in key set")]
    KeyNotFound,

    #[error("Signing key set could not be fetched")]
    KeySetUnavailable,

    #[error("Token signature or algorithm is invalid")]
    SignatureInvalid,

    #[error("Token claim failed validation: {0}")]
    ClaimsInvalid(ClaimKind),

    #[error("Authentication service unavailable")]
    AuthServiceUnavailable,
}

impl AuthError {
    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::KeySetUnavailable | AuthError::AuthServiceUnavailable => 503,
            AuthError::MissingHeader
            | AuthError::MalformedHeader
            | AuthError::MalformedToken
            | AuthError::KeyNotFound
            | AuthError::SignatureInvalid
            | AuthError::ClaimsInvalid(_) => 401,
        }
    }

    /// Whether the caller may retry the same credentials later.
    pub fn is_retryable(&self) -> bool {
        self.status_code() == 503
    }

    /// Stable error code returned in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "MISSING_HEADER",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::KeyNotFound => "KEY_NOT_FOUND",
            AuthError::KeySetUnavailable => "KEY_SET_UNAVAILABLE",
            AuthError::SignatureInvalid => "SIGNATURE_INVALID",
            AuthError::ClaimsInvalid(_) => "CLAIMS_INVALID",
            AuthError::AuthServiceUnavailable => "AUTH_SERVICE_UNAVAILABLE",
        }
    }

    /// Low-cardinality label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::KeySetUnavailable => "key_set_unavailable",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimsInvalid(_) => "claims_invalid",
            AuthError::AuthServiceUnavailable => "auth_service_unavailable",
        }
    }

    /// Generic category text safe to return to clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "Authentication is required",
            AuthError::MalformedHeader => "Authorization header must be 'Bearer <token>'",
            AuthError::KeySetUnavailable | AuthError::AuthServiceUnavailable => {
                "Authentication service temporarily unavailable"
            }
            AuthError::MalformedToken
            | AuthError::KeyNotFound
            | AuthError::SignatureInvalid
            | AuthError::ClaimsInvalid(_) => "The access token is invalid or expired",
        }
    }
}
