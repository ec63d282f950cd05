//! JWT claims structure.
//!
//! Contains the claims extracted from verified JWTs: the registered claims
//! the middleware inspects as typed fields, plus the full claim object for
//! anything else. The `sub` field is redacted in Debug output to prevent
//! exposure in logs.

use crate::auth::error::ClaimKind;
use common::jwt::validate_iat_at;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// The `aud` claim, which may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Whether `audience` is one of the token's audiences.
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(aud) => Some(Audience::One(aud.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(ToString::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Audience::Many),
            _ => None,
        }
    }
}

/// Claims of a verified token.
///
/// Created per request by the verifier and stored in the request
/// extensions. Never persisted.
#[derive(Clone, PartialEq)]
pub struct TokenClaims {
    /// Subject (user or client identifier) - redacted in Debug output.
    pub sub: String,

    /// Intended audience(s).
    pub aud: Audience,

    /// Issuer.
    pub iss: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds), when present.
    pub iat: Option<i64>,

    /// The full claim object, including claims not modelled above.
    pub raw: Map<String, Value>,
}

/// Custom Debug implementation that redacts the `sub` field.
///
/// Raw claims are listed by name only since they may repeat the subject
/// or carry other personal data.
impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("raw", &self.raw.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn numeric_date(value: &Value) -> Option<i64> {
    #[allow(clippy::cast_possible_truncation)]
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
}

impl TokenClaims {
    /// Build typed claims from a verified claim object.
    ///
    /// # Errors
    ///
    /// Returns the first registered claim that is missing or has the wrong
    /// JSON type. `iat` is optional but must be numeric when present.
    pub fn from_raw(raw: Map<String, Value>) -> Result<Self, ClaimKind> {
        let sub = raw
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(ClaimKind::Subject)?
            .to_string();

        let iss = raw
            .get("iss")
            .and_then(Value::as_str)
            .ok_or(ClaimKind::Issuer)?
            .to_string();

        let aud = raw
            .get("aud")
            .and_then(Audience::from_value)
            .ok_or(ClaimKind::Audience)?;

        let exp = raw
            .get("exp")
            .and_then(numeric_date)
            .ok_or(ClaimKind::Expiry)?;

        let iat = match raw.get("iat") {
            None | Some(Value::Null) => None,
            Some(value) => Some(numeric_date(value).ok_or(ClaimKind::IssuedAt)?),
        };

        Ok(Self {
            sub,
            aud,
            iss,
            exp,
            iat,
            raw,
        })
    }

    /// Look up any claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    /// The user-id segment of the subject.
    ///
    /// Identity providers commonly prefix subjects with the connection name
    /// (`auth0|abc123`); this returns the part after the last `|`, or the
    /// whole subject when there is no prefix.
    pub fn user_id(&self) -> &str {
        self.sub.rsplit('|').next().unwrap_or(&self.sub)
    }

    /// Whether this subject may act on the given customer.
    ///
    /// Allowed when the subject is a configured service account, or when the
    /// subject (or its user-id segment) equals the customer ID exactly.
    pub fn may_access_customer(&self, customer_id: &str, service_accounts: &[String]) -> bool {
        if service_accounts.iter().any(|account| account == &self.sub) {
            return true;
        }
        !customer_id.is_empty() && (self.sub == customer_id || self.user_id() == customer_id)
    }
}

/// Expected values the claims are validated against.
#[derive(Debug, Clone)]
pub struct ClaimRules {
    /// Exact expected `iss`.
    pub issuer: String,

    /// The token must carry at least one of these in `aud`.
    pub audiences: Vec<String>,

    /// Tolerance for `iat` values in the future.
    pub clock_skew: Duration,
}

/// Validate claims against the expected values at time `now`.
///
/// Checks run in order: issuer, audience, expiry, issued-at. The first
/// failing claim is returned.
///
/// # Errors
///
/// Returns the [`ClaimKind`] of the first claim that does not hold.
pub fn validate_claims(claims: &TokenClaims, rules: &ClaimRules, now: i64) -> Result<(), ClaimKind> {
    if claims.iss != rules.issuer {
        tracing::debug!(target: "payments.auth.claims", iss = %claims.iss, "Unexpected issuer");
        return Err(ClaimKind::Issuer);
    }

    if !rules
        .audiences
        .iter()
        .any(|expected| claims.aud.contains(expected))
    {
        tracing::debug!(target: "payments.auth.claims", aud = ?claims.aud, "Audience mismatch");
        return Err(ClaimKind::Audience);
    }

    if claims.exp <= now {
        tracing::debug!(target: "payments.auth.claims", exp = claims.exp, now = now, "Token expired");
        return Err(ClaimKind::Expiry);
    }

    if let Some(iat) = claims.iat {
        validate_iat_at(iat, rules.clock_skew, now).map_err(|_| ClaimKind::IssuedAt)?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    fn rules() -> ClaimRules {
        ClaimRules {
            issuer: "https://issuer.test/".to_string(),
            audiences: vec!["payments-api".to_string()],
            clock_skew: Duration::from_secs(300),
        }
    }

    fn claims_with(overrides: Value) -> TokenClaims {
        let mut base = raw(json!({
            "sub": "auth0|cust-123",
            "iss": "https://issuer.test/",
            "aud": "payments-api",
            "exp": NOW + 3600,
            "iat": NOW,
        }));
        for (k, v) in raw(overrides) {
            base.insert(k, v);
        }
        TokenClaims::from_raw(base).expect("valid claims")
    }

    #[test]
    fn test_from_raw_keeps_custom_claims() {
        let claims = claims_with(json!({"scope": "read:customers", "email": "a@b.c"}));

        assert_eq!(claims.sub, "auth0|cust-123");
        assert_eq!(claims.exp, NOW + 3600);
        assert_eq!(claims.iat, Some(NOW));
        assert_eq!(claims.get("scope"), Some(&json!("read:customers")));
    }

    #[test]
    fn test_from_raw_reports_missing_claims() {
        let full = json!({"sub": "s", "iss": "i", "aud": "a", "exp": NOW});
        for (name, kind) in [
            ("sub", ClaimKind::Subject),
            ("iss", ClaimKind::Issuer),
            ("aud", ClaimKind::Audience),
            ("exp", ClaimKind::Expiry),
        ] {
            let mut map = raw(full.clone());
            map.remove(name);
            assert_eq!(TokenClaims::from_raw(map).unwrap_err(), kind, "{name}");
        }
    }

    #[test]
    fn test_from_raw_rejects_mistyped_claims() {
        let map = raw(json!({"sub": "s", "iss": "i", "aud": [1, 2], "exp": NOW}));
        assert_eq!(TokenClaims::from_raw(map).unwrap_err(), ClaimKind::Audience);

        let map = raw(json!({"sub": "s", "iss": "i", "aud": "a", "exp": "tomorrow"}));
        assert_eq!(TokenClaims::from_raw(map).unwrap_err(), ClaimKind::Expiry);

        let map = raw(json!({"sub": "s", "iss": "i", "aud": "a", "exp": NOW, "iat": "now"}));
        assert_eq!(TokenClaims::from_raw(map).unwrap_err(), ClaimKind::IssuedAt);
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims = claims_with(json!({}));
        let debug_str = format!("{claims:?}");

        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("cust-123"));
    }

    #[test]
    fn test_valid_claims_pass() {
        assert_eq!(validate_claims(&claims_with(json!({})), &rules(), NOW), Ok(()));
    }

    #[test]
    fn test_audience_array_matches_any() {
        let claims = claims_with(json!({"aud": ["other-api", "payments-api"]}));
        assert_eq!(validate_claims(&claims, &rules(), NOW), Ok(()));
    }

    #[test]
    fn test_one_of_several_expected_audiences_suffices() {
        let mut rules = rules();
        rules.audiences = vec!["legacy-api".to_string(), "other-api".to_string()];
        let claims = claims_with(json!({"aud": ["other-api"]}));
        assert_eq!(validate_claims(&claims, &rules, NOW), Ok(()));
    }

    #[test]
    fn test_issuer_must_match_exactly() {
        let claims = claims_with(json!({"iss": "https://issuer.test"}));
        assert_eq!(
            validate_claims(&claims, &rules(), NOW),
            Err(ClaimKind::Issuer)
        );
    }

    #[test]
    fn test_audience_mismatch() {
        let claims = claims_with(json!({"aud": "other-api"}));
        assert_eq!(
            validate_claims(&claims, &rules(), NOW),
            Err(ClaimKind::Audience)
        );
    }

    #[test]
    fn test_expiry_is_strict() {
        let at_now = claims_with(json!({"exp": NOW}));
        assert_eq!(
            validate_claims(&at_now, &rules(), NOW),
            Err(ClaimKind::Expiry)
        );

        let next_second = claims_with(json!({"exp": NOW + 1}));
        assert_eq!(validate_claims(&next_second, &rules(), NOW), Ok(()));
    }

    #[test]
    fn test_iat_beyond_skew_rejected() {
        let claims = claims_with(json!({"iat": NOW + 301}));
        assert_eq!(
            validate_claims(&claims, &rules(), NOW),
            Err(ClaimKind::IssuedAt)
        );

        let within = claims_with(json!({"iat": NOW + 300}));
        assert_eq!(validate_claims(&within, &rules(), NOW), Ok(()));
    }

    #[test]
    fn test_iat_optional() {
        let mut map = raw(json!({
            "sub": "s", "iss": "https://issuer.test/", "aud": "payments-api", "exp": NOW + 10
        }));
        map.remove("iat");
        let claims = TokenClaims::from_raw(map).unwrap();
        assert_eq!(claims.iat, None);
        assert_eq!(validate_claims(&claims, &rules(), NOW), Ok(()));
    }

    #[test]
    fn test_user_id_segment() {
        assert_eq!(claims_with(json!({})).user_id(), "cust-123");
        assert_eq!(
            claims_with(json!({"sub": "google-oauth2|a|b"})).user_id(),
            "b"
        );
        assert_eq!(claims_with(json!({"sub": "plain"})).user_id(), "plain");
    }

    #[test]
    fn test_owner_check_is_exact() {
        let claims = claims_with(json!({}));
        let none: Vec<String> = vec![];

        assert!(claims.may_access_customer("cust-123", &none));
        assert!(!claims.may_access_customer("cust-12", &none));
        assert!(!claims.may_access_customer("123", &none));
        assert!(!claims.may_access_customer("", &none));
    }

    #[test]
    fn test_owner_check_full_subject() {
        let claims = claims_with(json!({"sub": "cust-9"}));
        assert!(claims.may_access_customer("cust-9", &[]));
    }

    #[test]
    fn test_owner_check_service_account() {
        let claims = claims_with(json!({"sub": "billing-worker@clients"}));
        let accounts = vec!["billing-worker@clients".to_string()];

        assert!(claims.may_access_customer("anyone", &accounts));
        assert!(!claims.may_access_customer("anyone", &[]));
    }
}
