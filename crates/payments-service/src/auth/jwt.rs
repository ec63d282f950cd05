//! Bearer token verification.
//!
//! Validates incoming JWTs using public keys from the [`KeyResolver`].
//! The pipeline is linear and never retries:
//!
//! ```text
//! Extract -> Decode Header -> Resolve Key -> Verify Signature -> Validate Claims -> Accept
//! ```
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only asymmetric algorithms from the configured list are accepted, and the
//!   header `alg` is checked before any key lookup
//! - A JWK that pins an `alg` only verifies tokens declaring that `alg`
//! - The token value is never logged

use crate::auth::claims::{validate_claims, ClaimRules, TokenClaims};
use crate::auth::error::AuthError;
use crate::auth::jwks::{KeyResolver, SigningKey};
use axum::http::HeaderValue;
use common::jwt::{decode_header, parse_asymmetric_algorithm};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Extract the token from an `Authorization` header value.
///
/// Accepts exactly `Bearer <token>`: case-sensitive scheme, one space, and a
/// non-empty token without whitespace.
///
/// # Errors
///
/// - `AuthError::MissingHeader` - No header
/// - `AuthError::MalformedHeader` - Anything else that is not a single bearer token
pub fn extract_bearer(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingHeader)?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "payments.auth.jwt", "Authorization header is not visible ASCII");
        AuthError::MalformedHeader
    })?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "payments.auth.jwt", "Authorization header is not a Bearer credential");
        AuthError::MalformedHeader
    })?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        tracing::debug!(target: "payments.auth.jwt", "Bearer credential is empty or split");
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Outcome of authenticating one request.
///
/// Produced once per request by the middleware and consumed immediately.
#[derive(Debug, Clone)]
pub struct AuthDecision {
    outcome: Result<TokenClaims, AuthError>,
}

impl AuthDecision {
    pub fn allow(claims: TokenClaims) -> Self {
        Self {
            outcome: Ok(claims),
        }
    }

    pub fn deny(reason: AuthError) -> Self {
        Self {
            outcome: Err(reason),
        }
    }

    pub fn allowed(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        self.outcome.as_ref().ok()
    }

    pub fn failure_reason(&self) -> Option<AuthError> {
        self.outcome.as_ref().err().copied()
    }

    /// Consume the decision.
    ///
    /// # Errors
    ///
    /// Returns the failure reason of a denied request.
    pub fn into_result(self) -> Result<TokenClaims, AuthError> {
        self.outcome
    }
}

impl From<Result<TokenClaims, AuthError>> for AuthDecision {
    fn from(outcome: Result<TokenClaims, AuthError>) -> Self {
        Self { outcome }
    }
}

/// Token verifier backed by the JWKS key resolver.
pub struct TokenVerifier {
    /// Key resolver for fetching public keys.
    key_resolver: Arc<KeyResolver>,

    /// Expected issuer, audiences and clock skew.
    rules: ClaimRules,

    /// Accepted signature algorithms (asymmetric only).
    algorithms: Vec<Algorithm>,
}

impl TokenVerifier {
    /// Create a new verifier.
    ///
    /// Symmetric algorithms in `algorithms` are dropped: a public key from
    /// a JWKS must never double as an HMAC secret.
    pub fn new(key_resolver: Arc<KeyResolver>, rules: ClaimRules, algorithms: Vec<Algorithm>) -> Self {
        let algorithms: Vec<Algorithm> = algorithms
            .into_iter()
            .filter(|alg| common::jwt::ASYMMETRIC_ALGORITHMS.contains(alg))
            .collect();

        Self {
            key_resolver,
            rules,
            algorithms,
        }
    }

    pub fn key_resolver(&self) -> &Arc<KeyResolver> {
        &self.key_resolver
    }

    /// Authenticate a request from its `Authorization` header.
    #[instrument(skip_all, name = "payments.auth.decide")]
    pub async fn decide(&self, header: Option<&HeaderValue>) -> AuthDecision {
        let outcome = match extract_bearer(header) {
            Ok(token) => self.verify(token).await,
            Err(e) => Err(e),
        };
        AuthDecision::from(outcome)
    }

    /// Verify a token at the current time.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing stage.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Verify a token against an explicit `now` (Unix seconds).
    ///
    /// # Security Checks
    ///
    /// 1. Size check and header decode (kid + alg) without trusting the token
    /// 2. Header alg must be an accepted asymmetric algorithm
    /// 3. Resolve the key by kid (at most one JWKS fetch)
    /// 4. Key type and pinned alg must fit the header alg
    /// 5. Verify the signature
    /// 6. Validate iss, aud, exp and iat
    ///
    /// # Errors
    ///
    /// - `MalformedToken` - Structure or encoding is invalid
    /// - `KeyNotFound` - No key with the token's kid after a refresh
    /// - `AuthServiceUnavailable` - Keys could not be fetched
    /// - `SignatureInvalid` - Algorithm refused or signature does not verify
    /// - `ClaimsInvalid` - A registered claim failed validation
    #[instrument(skip_all)]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        // 1. Decode header (includes size check via common::jwt)
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "payments.auth.jwt", error = ?e, "Token header decode failed");
            AuthError::MalformedToken
        })?;

        // 2. Refuse algorithms outside the configured list before any network work
        let alg = self.accepted_algorithm(&header.alg)?;

        // 3. Resolve key
        let key = self
            .key_resolver
            .get_key(&header.kid)
            .await
            .map_err(|e| match e {
                AuthError::KeySetUnavailable => AuthError::AuthServiceUnavailable,
                other => other,
            })?;

        // 4 + 5. Verify signature
        let raw = verify_signature(token, &key, alg)?;

        // 6. Validate claims
        let claims = TokenClaims::from_raw(raw).map_err(AuthError::ClaimsInvalid)?;
        validate_claims(&claims, &self.rules, now).map_err(AuthError::ClaimsInvalid)?;

        tracing::debug!(target: "payments.auth.jwt", kid = %header.kid, "Token validated successfully");
        Ok(claims)
    }

    fn accepted_algorithm(&self, name: &str) -> Result<Algorithm, AuthError> {
        parse_asymmetric_algorithm(name)
            .filter(|alg| self.algorithms.contains(alg))
            .ok_or_else(|| {
                tracing::warn!(target: "payments.auth.jwt", alg = %name, "Token declares a refused algorithm");
                AuthError::SignatureInvalid
            })
    }
}

/// Verify the signature and return the claim object.
///
/// Timing claims are validated afterwards with an explicit clock, so
/// jsonwebtoken's own exp/nbf/aud checks are disabled here.
fn verify_signature(
    token: &str,
    key: &SigningKey,
    alg: Algorithm,
) -> Result<Map<String, Value>, AuthError> {
    if !key.accepts(alg) {
        tracing::warn!(
            target: "payments.auth.jwt",
            kid = %key.kid(),
            alg = ?alg,
            key_alg = ?key.algorithm(),
            "Token algorithm does not match key"
        );
        return Err(AuthError::SignatureInvalid);
    }

    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation.leeway = 0;

    let token_data =
        decode::<Map<String, Value>>(token, key.decoding_key(), &validation).map_err(|e| {
            tracing::debug!(target: "payments.auth.jwt", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::MalformedToken,
                _ => AuthError::SignatureInvalid,
            }
        })?;

    Ok(token_data.claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    fn verifier(algorithms: Vec<Algorithm>) -> TokenVerifier {
        let resolver = Arc::new(KeyResolver::new(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            Duration::from_secs(300),
            Duration::from_millis(200),
        ));
        TokenVerifier::new(
            resolver,
            ClaimRules {
                issuer: "https://issuer.test/".to_string(),
                audiences: vec!["payments-api".to_string()],
                clock_skew: Duration::from_secs(300),
            },
            algorithms,
        )
    }

    #[test]
    fn test_extract_bearer_valid() {
        let value = header("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(Some(&value)), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_missing() {
        assert_eq!(extract_bearer(None), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_extract_bearer_malformed_variants() {
        for raw in [
            "Bearer",
            "Bearer ",
            "Bearer a b",
            "Bearer  abc",
            "bearer abc",
            "BEARER abc",
            "Basic dXNlcjpwYXNz",
            "Token abc",
            "abc",
            "Bearer\tabc",
        ] {
            let value = header(raw);
            assert_eq!(
                extract_bearer(Some(&value)),
                Err(AuthError::MalformedHeader),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_extract_bearer_non_ascii() {
        let value = HeaderValue::from_bytes(b"Bearer \xffabc").unwrap();
        assert_eq!(extract_bearer(Some(&value)), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn test_hmac_algorithms_are_dropped() {
        let verifier = verifier(vec![Algorithm::HS256, Algorithm::RS256]);
        assert_eq!(verifier.algorithms, vec![Algorithm::RS256]);
    }

    #[test]
    fn test_accepted_algorithm() {
        let verifier = verifier(vec![Algorithm::RS256, Algorithm::EdDSA]);

        assert_eq!(verifier.accepted_algorithm("RS256"), Ok(Algorithm::RS256));
        assert_eq!(verifier.accepted_algorithm("EdDSA"), Ok(Algorithm::EdDSA));
        assert_eq!(
            verifier.accepted_algorithm("ES256"),
            Err(AuthError::SignatureInvalid),
            "asymmetric but not configured"
        );
        assert_eq!(
            verifier.accepted_algorithm("HS256"),
            Err(AuthError::SignatureInvalid)
        );
        assert_eq!(
            verifier.accepted_algorithm("none"),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[tokio::test]
    async fn test_malformed_token_fails_before_key_lookup() {
        let verifier = verifier(vec![Algorithm::RS256]);

        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert_eq!(err, AuthError::MalformedToken);

        let oversized = "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES + 1);
        let err = verifier.verify(&oversized).await.unwrap_err();
        assert_eq!(err, AuthError::MalformedToken);
    }

    #[tokio::test]
    async fn test_unreachable_jwks_maps_to_service_unavailable() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let verifier = verifier(vec![Algorithm::RS256]);
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k1"}"#);
        let token = format!("{header_b64}.e30.c2ln");

        let err = verifier.verify(&token).await.unwrap_err();
        assert_eq!(err, AuthError::AuthServiceUnavailable);
    }

    #[tokio::test]
    async fn test_decide_reports_missing_header() {
        let verifier = verifier(vec![Algorithm::RS256]);
        let decision = verifier.decide(None).await;

        assert!(!decision.allowed());
        assert!(decision.claims().is_none());
        assert_eq!(decision.failure_reason(), Some(AuthError::MissingHeader));
    }
}
