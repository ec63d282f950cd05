//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating the claims of test bearer tokens.

use crate::crypto_fixtures::TestKeypair;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer the test server expects.
pub const TEST_ISSUER: &str = "https://issuer.test/";

/// Audience the test server expects.
pub const TEST_AUDIENCE: &str = "payments-api";

/// Subject configured as a service account on the test server.
pub const TEST_SERVICE_ACCOUNT: &str = "billing-service@clients";

/// Builder for creating test JWT claims
///
/// Defaults produce claims the test server accepts: expected issuer and
/// audience, one hour of validity, issued now.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("auth0|cus-1")
///     .expires_in(60)
///     .sign(&keypair);
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("iat".to_string(), json!(now.timestamp()));
        Self { claims }
    }

    /// Set the subject
    pub fn for_subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set a single audience
    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set an audience array
    pub fn audiences(self, audiences: &[&str]) -> Self {
        self.claim("aud", json!(audiences))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set issued-at in seconds from now (positive for future-dated)
    pub fn issued_in(self, seconds: i64) -> Self {
        self.claim("iat", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set or replace any claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with `keypair`
    pub fn sign(self, keypair: &TestKeypair) -> String {
        keypair.sign(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_valid_claims() {
        let claims = TestTokenBuilder::new().for_subject("alice").build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["iss"], TEST_ISSUER);
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_without_claim() {
        let claims = TestTokenBuilder::new().without("iat").build();
        assert!(claims.get("iat").is_none());
    }

    #[test]
    fn test_builder_audience_array() {
        let claims = TestTokenBuilder::new()
            .audiences(&["other", TEST_AUDIENCE])
            .build();
        assert_eq!(claims["aud"], json!(["other", TEST_AUDIENCE]));
    }

    #[test]
    fn test_builder_default() {
        let claims = TestTokenBuilder::default().build();
        assert_eq!(claims["sub"], "test-subject");
    }
}
