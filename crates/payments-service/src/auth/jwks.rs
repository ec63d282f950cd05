//! Key resolver: fetches and caches the identity provider's JWKS.
//!
//! The resolver fetches public keys from the configured
//! `/.well-known/jwks.json` endpoint and caches them as an immutable
//! [`KeySet`] behind an `Arc`. A refresh builds a new `KeySet` and swaps it
//! in wholesale, so a key dropped by the provider is unusable as soon as the
//! refresh completes.
//!
//! # Lookup rules
//!
//! - Fresh set containing the key: returned without network access.
//! - Fresh set missing the key (rotation): one re-fetch, then one retry.
//! - Stale or empty cache: one fetch, then lookup.
//! - Fetch failure: the previous set stays in place and is still consulted.
//!
//! Concurrent refreshes are coalesced: callers queue on `refresh_lock` and a
//! caller that finds a newer generation than the one it saw reuses it. The
//! cache lock is never held across a network call.

use crate::auth::error::AuthError;
use crate::observability::metrics::{record_jwks_fetch, record_jwks_lookup};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA", "EC" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Declared algorithm, if the provider pins one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// EC x coordinate, or the OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document.
///
/// Keys are kept as raw JSON so one unparsable entry does not reject the
/// whole document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<serde_json::Value>,
}

/// Reasons a JWK is skipped when building a key set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwkError {
    #[error("key has no kid")]
    MissingKid,

    #[error("key use '{0}' is not 'sig'")]
    NotForSigning(String),

    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    #[error("unsupported curve '{0}'")]
    UnsupportedCurve(String),

    #[error("algorithm '{0}' is not an accepted asymmetric algorithm")]
    UnsupportedAlgorithm(String),

    #[error("missing key component '{0}'")]
    MissingComponent(&'static str),

    #[error("invalid key material: {0}")]
    InvalidMaterial(String),
}

/// Public key family of a [`SigningKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    EcP256,
    EcP384,
    Ed25519,
}

impl KeyType {
    /// Whether a token signed with `alg` can be verified by this key type.
    pub fn supports(self, alg: Algorithm) -> bool {
        matches!(
            (self, alg),
            (
                KeyType::Rsa,
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ) | (KeyType::EcP256, Algorithm::ES256)
                | (KeyType::EcP384, Algorithm::ES384)
                | (KeyType::Ed25519, Algorithm::EdDSA)
        )
    }
}

/// A verification key decoded from one JWK.
///
/// Immutable. Replaced only by replacing the whole [`KeySet`].
pub struct SigningKey {
    kid: String,
    algorithm: Option<Algorithm>,
    key_type: KeyType,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Decode a JWK into a verification key.
    ///
    /// # Errors
    ///
    /// Returns a [`JwkError`] describing why the JWK cannot be used.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, JwkError> {
        let kid = jwk
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(JwkError::MissingKid)?
            .to_string();

        if let Some(key_use) = jwk.key_use.as_deref() {
            if key_use != "sig" {
                return Err(JwkError::NotForSigning(key_use.to_string()));
            }
        }

        let algorithm = match jwk.alg.as_deref() {
            None => None,
            Some(name) => Some(
                common::jwt::parse_asymmetric_algorithm(name)
                    .ok_or_else(|| JwkError::UnsupportedAlgorithm(name.to_string()))?,
            ),
        };

        let invalid = |e: jsonwebtoken::errors::Error| JwkError::InvalidMaterial(e.to_string());

        let (key_type, decoding_key) = match jwk.kty.as_str() {
            "RSA" => {
                let n = jwk.n.as_deref().ok_or(JwkError::MissingComponent("n"))?;
                let e = jwk.e.as_deref().ok_or(JwkError::MissingComponent("e"))?;
                (KeyType::Rsa, DecodingKey::from_rsa_components(n, e).map_err(invalid)?)
            }
            "EC" => {
                let key_type = match jwk.crv.as_deref() {
                    Some("P-256") => KeyType::EcP256,
                    Some("P-384") => KeyType::EcP384,
                    Some(other) => return Err(JwkError::UnsupportedCurve(other.to_string())),
                    None => return Err(JwkError::MissingComponent("crv")),
                };
                let x = jwk.x.as_deref().ok_or(JwkError::MissingComponent("x"))?;
                let y = jwk.y.as_deref().ok_or(JwkError::MissingComponent("y"))?;
                (key_type, DecodingKey::from_ec_components(x, y).map_err(invalid)?)
            }
            "OKP" => {
                match jwk.crv.as_deref() {
                    Some("Ed25519") => {}
                    Some(other) => return Err(JwkError::UnsupportedCurve(other.to_string())),
                    None => return Err(JwkError::MissingComponent("crv")),
                }
                let x = jwk.x.as_deref().ok_or(JwkError::MissingComponent("x"))?;
                (KeyType::Ed25519, DecodingKey::from_ed_components(x).map_err(invalid)?)
            }
            other => return Err(JwkError::UnsupportedKeyType(other.to_string())),
        };

        if let Some(alg) = algorithm {
            if !key_type.supports(alg) {
                return Err(JwkError::UnsupportedAlgorithm(format!("{alg:?}")));
            }
        }

        Ok(Self {
            kid,
            algorithm,
            key_type,
            decoding_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm pinned by the JWK `alg` field, if any.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Whether this key may verify a token whose header declares `alg`.
    ///
    /// The key type must fit the algorithm, and a pinned JWK `alg` must
    /// equal it.
    pub fn accepts(&self, alg: Algorithm) -> bool {
        self.key_type.supports(alg) && self.algorithm.map_or(true, |pinned| pinned == alg)
    }
}

/// An immutable snapshot of the provider's signing keys.
#[derive(Debug)]
pub struct KeySet {
    keys: Vec<Arc<SigningKey>>,
    fetched_at: Instant,
    source_url: String,
    generation: u64,
}

impl KeySet {
    /// Build a key set from a JWKS document, skipping unusable entries.
    pub fn from_document(document: JwksResponse, source_url: &str, generation: u64) -> Self {
        let mut keys: Vec<Arc<SigningKey>> = Vec::with_capacity(document.keys.len());

        for value in document.keys {
            let parsed = serde_json::from_value::<Jwk>(value)
                .map_err(|e| JwkError::InvalidMaterial(e.to_string()))
                .and_then(|jwk| SigningKey::from_jwk(&jwk));

            match parsed {
                Ok(key) => {
                    if keys.iter().any(|existing| existing.kid == key.kid) {
                        tracing::warn!(target: "payments.auth.jwks", kid = %key.kid, "Duplicate kid in JWKS, keeping first");
                        continue;
                    }
                    keys.push(Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(target: "payments.auth.jwks", error = %e, "Skipping unusable JWK");
                }
            }
        }

        Self {
            keys,
            fetched_at: Instant::now(),
            source_url: source_url.to_string(),
            generation,
        }
    }

    /// Find a key by ID.
    pub fn find(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.iter().find(|key| key.kid == kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Monotonic refresh counter; higher means fetched later.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn is_fresh(&self, freshness: Duration) -> bool {
        self.fetched_at.elapsed() < freshness
    }
}

/// Resolver for verification keys by key ID.
///
/// Thread-safe. Owned by the application and shared through `Arc` with the
/// token verifier; there is no global cache.
pub struct KeyResolver {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Current key set. Swapped wholesale on refresh.
    cache: RwLock<Option<Arc<KeySet>>>,

    /// Serializes fetches so concurrent refreshes share one request.
    refresh_lock: Mutex<()>,

    /// Last generation handed out.
    generation: AtomicU64,

    /// How long a fetched set is considered fresh.
    cache_ttl: Duration,

    /// Upper bound on a single JWKS fetch.
    fetch_timeout: Duration,
}

impl KeyResolver {
    /// Create a new resolver with an empty cache.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the identity provider's JWKS endpoint
    /// * `cache_ttl` - How long a fetched key set is served without refetching
    /// * `fetch_timeout` - Timeout for a single JWKS fetch
    pub fn new(jwks_url: String, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .connect_timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "payments.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            cache_ttl,
            fetch_timeout,
        }
    }

    /// Warm the cache at startup.
    ///
    /// A failure is logged and otherwise ignored: the first verification
    /// will fetch again.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn init(&self) {
        match self.refresh().await {
            Ok(set) => {
                tracing::info!(target: "payments.auth.jwks", key_count = set.len(), "JWKS cache warmed");
            }
            Err(e) => {
                tracing::warn!(target: "payments.auth.jwks", error = %e, "Initial JWKS fetch failed, will retry on demand");
            }
        }
    }

    /// Force a fetch, replacing the cached set on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the JWKS cannot be fetched;
    /// the previous set is left in place.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, AuthError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Drop the cached set.
    pub async fn teardown(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        tracing::debug!(target: "payments.auth.jwks", "JWKS cache cleared");
    }

    /// The cached set, if any, regardless of freshness.
    pub async fn current(&self) -> Option<Arc<KeySet>> {
        self.cache.read().await.clone()
    }

    /// Get a verification key by key ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if the key is absent after at most
    /// one fetch, and `AuthError::KeySetUnavailable` if a needed fetch fails
    /// and no cached set holds the key.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        let cached = self.current().await;

        if let Some(set) = cached.as_ref() {
            if set.is_fresh(self.cache_ttl) {
                if let Some(key) = set.find(kid) {
                    tracing::debug!(target: "payments.auth.jwks", kid = %kid, "JWKS cache hit");
                    record_jwks_lookup("hit");
                    return Ok(key);
                }
                tracing::debug!(target: "payments.auth.jwks", kid = %kid, "Key not in fresh JWKS cache, refetching");
                record_jwks_lookup("miss");
            } else {
                record_jwks_lookup("stale");
            }
        } else {
            record_jwks_lookup("empty");
        }

        let seen_generation = cached.as_ref().map(|set| set.generation);

        match self.refresh_coalesced(seen_generation).await {
            Ok(set) => set.find(kid).ok_or_else(|| {
                tracing::warn!(target: "payments.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
                AuthError::KeyNotFound
            }),
            Err(e) => {
                // Stale-but-valid: the previous set survives a failed fetch.
                if let Some(key) = cached.as_ref().and_then(|set| set.find(kid)) {
                    tracing::warn!(
                        target: "payments.auth.jwks",
                        kid = %kid,
                        "JWKS fetch failed, serving key from previous key set"
                    );
                    return Ok(key);
                }
                Err(e)
            }
        }
    }

    /// Fetch unless another caller already replaced the set we saw.
    async fn refresh_coalesced(
        &self,
        seen_generation: Option<u64>,
    ) -> Result<Arc<KeySet>, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.current().await {
            if Some(current.generation) != seen_generation {
                tracing::debug!(
                    target: "payments.auth.jwks",
                    generation = current.generation,
                    "Reusing key set fetched by a concurrent caller"
                );
                return Ok(current);
            }
        }

        self.fetch_and_store().await
    }

    /// Fetch the JWKS and swap it in. Caller holds `refresh_lock`.
    async fn fetch_and_store(&self) -> Result<Arc<KeySet>, AuthError> {
        let start = Instant::now();
        let result = self.fetch().await;
        record_jwks_fetch(
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        let document = result?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let set = Arc::new(KeySet::from_document(document, &self.jwks_url, generation));

        tracing::info!(
            target: "payments.auth.jwks",
            key_count = set.len(),
            generation = generation,
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(Arc::clone(&set));

        Ok(set)
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<JwksResponse, AuthError> {
        tracing::debug!(target: "payments.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "payments.auth.jwks", error = %e, timeout = e.is_timeout(), "Failed to fetch JWKS");
                AuthError::KeySetUnavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "payments.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "payments.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    // Ed25519 public key from RFC 8037 appendix A.
    const ED25519_X: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";

    // P-256 public key from RFC 7515 appendix A.3.
    const P256_X: &str = "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU";
    const P256_Y: &str = "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0";

    // 2048-bit RSA test public key.
    const RSA_N: &str = "wt-9rDMDwzZoIlGzsWRlNzxOsYDnDEATk3ze--lLQE-UfCBWV6zaM2XvjQeQk3kyUKeEpr9Be_CpZHsayfuXRtg9EjjzkABNOi7JaSwIH4og7mY5pOBUn5jFaU5ArUrb2q8xTHhOwfqWddv0zwMqWeXVJawFt492N-_Uz43ws88PwgOZdIRFpDuqWHagJASxE6_whf0WLTC3DQlplEqKuBzHkjNHxs-o5skyP_LR9q-ZHH4KjTAz2ujpE-1Qreo-DUstIvR4mrku1YOopmgZk7fa6s0vFptxIBqXg9Vh7XLX0_wDxFtw1RFIOCPt__Ga5ptnsq0XmALsK6SYM_NGaw";
    const RSA_E: &str = "AQAB";

    fn jwk(value: serde_json::Value) -> Jwk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_jwk_deserialization() {
        let jwk = jwk(json!({
            "kty": "RSA",
            "kid": "rsa-01",
            "n": RSA_N,
            "e": RSA_E,
            "alg": "RS256",
            "use": "sig"
        }));

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid.as_deref(), Some("rsa-01"));
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert!(jwk.x.is_none());
    }

    #[test]
    fn test_rsa_key_from_jwk() {
        let key = SigningKey::from_jwk(&jwk(json!({
            "kty": "RSA", "kid": "rsa-01", "n": RSA_N, "e": RSA_E, "alg": "RS256"
        })))
        .unwrap();

        assert_eq!(key.kid(), "rsa-01");
        assert_eq!(key.key_type(), KeyType::Rsa);
        assert!(key.accepts(Algorithm::RS256));
        assert!(!key.accepts(Algorithm::RS512), "pinned alg must match");
        assert!(!key.accepts(Algorithm::ES256));
    }

    #[test]
    fn test_unpinned_rsa_key_accepts_rsa_family() {
        let key = SigningKey::from_jwk(&jwk(json!({
            "kty": "RSA", "kid": "rsa-01", "n": RSA_N, "e": RSA_E
        })))
        .unwrap();

        assert!(key.accepts(Algorithm::RS256));
        assert!(key.accepts(Algorithm::PS384));
        assert!(!key.accepts(Algorithm::EdDSA));
    }

    #[test]
    fn test_ec_key_from_jwk() {
        let key = SigningKey::from_jwk(&jwk(json!({
            "kty": "EC", "kid": "ec-01", "crv": "P-256", "x": P256_X, "y": P256_Y
        })))
        .unwrap();

        assert_eq!(key.key_type(), KeyType::EcP256);
        assert!(key.accepts(Algorithm::ES256));
        assert!(!key.accepts(Algorithm::ES384));
    }

    #[test]
    fn test_okp_key_from_jwk() {
        let key = SigningKey::from_jwk(&jwk(json!({
            "kty": "OKP", "kid": "ed-01", "crv": "Ed25519", "x": ED25519_X, "alg": "EdDSA"
        })))
        .unwrap();

        assert_eq!(key.key_type(), KeyType::Ed25519);
        assert!(key.accepts(Algorithm::EdDSA));
    }

    #[test]
    fn test_unusable_jwks_are_rejected() {
        let cases = [
            (
                json!({"kty": "RSA", "n": RSA_N, "e": RSA_E}),
                JwkError::MissingKid,
            ),
            (
                json!({"kty": "RSA", "kid": "k", "use": "enc", "n": RSA_N, "e": RSA_E}),
                JwkError::NotForSigning("enc".to_string()),
            ),
            (
                json!({"kty": "oct", "kid": "k", "k": "c2VjcmV0"}),
                JwkError::UnsupportedKeyType("oct".to_string()),
            ),
            (
                json!({"kty": "RSA", "kid": "k", "alg": "HS256", "n": RSA_N, "e": RSA_E}),
                JwkError::UnsupportedAlgorithm("HS256".to_string()),
            ),
            (
                json!({"kty": "RSA", "kid": "k", "e": RSA_E}),
                JwkError::MissingComponent("n"),
            ),
            (
                json!({"kty": "EC", "kid": "k", "crv": "secp256k1", "x": P256_X, "y": P256_Y}),
                JwkError::UnsupportedCurve("secp256k1".to_string()),
            ),
            (
                json!({"kty": "OKP", "kid": "k", "crv": "X25519", "x": ED25519_X}),
                JwkError::UnsupportedCurve("X25519".to_string()),
            ),
        ];

        for (value, expected) in cases {
            let err = SigningKey::from_jwk(&jwk(value.clone())).unwrap_err();
            assert_eq!(err, expected, "{value}");
        }
    }

    #[test]
    fn test_alg_incompatible_with_key_type_rejected() {
        let err = SigningKey::from_jwk(&jwk(json!({
            "kty": "RSA", "kid": "k", "alg": "ES256", "n": RSA_N, "e": RSA_E
        })))
        .unwrap_err();

        assert!(matches!(err, JwkError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_key_set_skips_bad_entries() {
        let document: JwksResponse = serde_json::from_value(json!({
            "keys": [
                {"kty": "RSA", "kid": "good", "n": RSA_N, "e": RSA_E},
                {"kid": "no-kty"},
                {"kty": "OKP", "kid": "bad-x", "crv": "Ed25519", "x": "!!!"},
                {"kty": "OKP", "kid": "ed", "crv": "Ed25519", "x": ED25519_X},
                {"kty": "RSA", "kid": "good", "n": RSA_N, "e": RSA_E}
            ]
        }))
        .unwrap();

        let set = KeySet::from_document(document, "https://idp.test/jwks", 7);

        assert_eq!(set.len(), 2);
        assert!(set.find("good").is_some());
        assert!(set.find("ed").is_some());
        assert!(set.find("bad-x").is_none());
        assert_eq!(set.generation(), 7);
        assert_eq!(set.source_url(), "https://idp.test/jwks");
    }

    #[test]
    fn test_key_set_freshness() {
        let set = KeySet::from_document(JwksResponse { keys: vec![] }, "u", 1);
        assert!(set.is_fresh(Duration::from_secs(60)));
        assert!(!set.is_fresh(Duration::ZERO));
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_starts_empty_and_tears_down() {
        let resolver = KeyResolver::new(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            Duration::from_secs(300),
            Duration::from_millis(200),
        );
        assert!(resolver.current().await.is_none());

        resolver.teardown().await;
        assert!(resolver.current().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_jwks_is_unavailable_not_not_found() {
        // Port 9 (discard) is not listening on loopback.
        let resolver = KeyResolver::new(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            Duration::from_secs(300),
            Duration::from_millis(500),
        );

        let err = resolver.get_key("any").await.unwrap_err();
        assert_eq!(err, AuthError::KeySetUnavailable);
        assert!(resolver.current().await.is_none());
    }
}
