//! JWT utilities shared across the payments workspace.
//!
//! This module provides the parts of bearer-token validation that do not
//! depend on a particular key source:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Unverified header decoding (`alg` + `kid`) for key lookup
//! - iat validation logic
//! - The set of asymmetric algorithms a verifier may be configured with
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Symmetric (HMAC) algorithms are never accepted: a public JWKS key must
//!   not be usable as an HMAC secret
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_header, validate_iat_at, DEFAULT_CLOCK_SKEW};
//!
//! // Read alg/kid for JWKS lookup (signature NOT verified yet)
//! let header = decode_header(token)?;
//!
//! // After signature verification, validate iat against the verifier's clock
//! validate_iat_at(claims.iat, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical identity-provider access tokens are well
/// under 2KB, so 8KB leaves room for custom claims.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Tokens with `iat` (issued-at) timestamps more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Asymmetric signature algorithms a verifier may be configured to accept.
pub const ASYMMETRIC_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token is missing required `alg` header.
    #[error("The access token is invalid or expired")]
    MissingAlgorithm,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Header
// =============================================================================

/// The JOSE header fields needed to select a verification key.
///
/// `alg` is kept as the raw string so that values outside the
/// [`Algorithm`] enum (for example `none`) can be reported and rejected by
/// the caller instead of failing as a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signature algorithm, as it appears in the header.
    pub alg: String,

    /// Key ID used to look up the verification key in a JWKS.
    pub kid: String,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    alg: Option<serde_json::Value>,
    #[serde(default)]
    kid: Option<serde_json::Value>,
}

/// Decode the JOSE header of a JWT without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The returned `kid` must only be used for lookup in a trusted JWKS
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three non-empty segments, bad base64url, invalid JSON
/// - `MissingKid` - Header has no string `kid`, or it is empty
/// - `MissingAlgorithm` - Header has no string `alg`, or it is empty
pub fn decode_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .alg
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlgorithm)?;

    let kid = header
        .kid
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader { alg, kid })
}

// =============================================================================
// Algorithms
// =============================================================================

/// Parse an algorithm name, accepting only asymmetric algorithms.
///
/// Returns `None` for unknown names, `none`, and every HMAC algorithm.
#[must_use]
pub fn parse_asymmetric_algorithm(name: &str) -> Option<Algorithm> {
    Algorithm::from_str(name)
        .ok()
        .filter(|alg| ASYMMETRIC_ALGORITHMS.contains(alg))
}

// =============================================================================
// Claim timing
// =============================================================================

/// Validate the `iat` (issued-at) claim against an explicit `now` timestamp
/// with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
pub fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_clock_skew_defaults() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // decode_header Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_header_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, "RS256");
        assert_eq!(header.kid, "key-01");
    }

    #[test]
    fn test_decode_header_keeps_unknown_alg_verbatim() {
        let token = token_with_header(r#"{"alg":"none","kid":"key-01"}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, "none");
    }

    #[test]
    fn test_decode_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(decode_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_decode_header_empty_or_non_string_kid() {
        let empty = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        let numeric = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        let null = token_with_header(r#"{"alg":"RS256","kid":null}"#);

        assert_eq!(decode_header(&empty), Err(JwtValidationError::MissingKid));
        assert_eq!(decode_header(&numeric), Err(JwtValidationError::MissingKid));
        assert_eq!(decode_header(&null), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_decode_header_missing_alg() {
        let token = token_with_header(r#"{"kid":"key-01"}"#);
        assert_eq!(
            decode_header(&token),
            Err(JwtValidationError::MissingAlgorithm)
        );
    }

    #[test]
    fn test_decode_header_wrong_segment_count() {
        for token in ["", "single", "only.two", "a.b.c.d"] {
            assert_eq!(
                decode_header(token),
                Err(JwtValidationError::MalformedToken),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_decode_header_empty_segment() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k"}"#);
        let token = format!("{header_b64}..signature");
        assert_eq!(decode_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_decode_header_invalid_base64() {
        assert_eq!(
            decode_header("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_decode_header_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(decode_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_decode_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            decode_header(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_decode_header_at_size_limit() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key"}"#);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2;
        let payload_len = remaining / 2;
        let sig_len = remaining - payload_len;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(sig_len)
        );
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        let header = decode_header(&token).expect("token at the limit is accepted");
        assert_eq!(header.kid, "key");
    }

    // -------------------------------------------------------------------------
    // Algorithm Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_asymmetric_algorithm_accepts_public_key_algorithms() {
        assert_eq!(parse_asymmetric_algorithm("RS256"), Some(Algorithm::RS256));
        assert_eq!(parse_asymmetric_algorithm("ES256"), Some(Algorithm::ES256));
        assert_eq!(parse_asymmetric_algorithm("PS512"), Some(Algorithm::PS512));
        assert_eq!(parse_asymmetric_algorithm("EdDSA"), Some(Algorithm::EdDSA));
    }

    #[test]
    fn test_parse_asymmetric_algorithm_rejects_hmac_and_none() {
        for name in ["HS256", "HS384", "HS512", "none", "None", "rs256", ""] {
            assert_eq!(parse_asymmetric_algorithm(name), None, "{name}");
        }
    }

    // -------------------------------------------------------------------------
    // validate_iat_at Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_at_current_and_past() {
        let now = 1_700_000_000_i64;
        assert!(validate_iat_at(now, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert!(validate_iat_at(now - 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_at_far_future() {
        let now = 1_700_000_000_i64;
        assert_eq!(
            validate_iat_at(now + 86400, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        // iat == now + skew is the last accepted value
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());

        // iat == now + skew + 1 is the first rejected value
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }
}
