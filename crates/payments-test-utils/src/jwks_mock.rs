//! Mocked identity-provider JWKS endpoint
//!
//! Wraps a `wiremock` server that serves `/.well-known/jwks.json` and lets
//! tests swap the served document, fail it, slow it down and count fetches.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Responder whose answer can be swapped while the server runs.
#[derive(Clone)]
struct SwappableResponder {
    current: Arc<Mutex<ResponseTemplate>>,
    fetches: Arc<AtomicUsize>,
}

impl Respond for SwappableResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }
}

/// Mock JWKS endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::with_keys(&[&keypair]).await;
/// let server = TestPaymentsServer::spawn(&jwks.url()).await?;
/// assert_eq!(jwks.fetch_count(), 1);
/// ```
pub struct MockJwksServer {
    server: MockServer,
    responder: SwappableResponder,
}

impl MockJwksServer {
    /// Start a server that answers 404 until something is served.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let responder = SwappableResponder {
            current: Arc::new(Mutex::new(ResponseTemplate::new(404))),
            fetches: Arc::new(AtomicUsize::new(0)),
        };

        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(responder.clone())
            .mount(&server)
            .await;

        Self { server, responder }
    }

    /// Start a server already serving `keys`.
    pub async fn with_keys(keys: &[&TestKeypair]) -> Self {
        let jwks = Self::start().await;
        jwks.serve_keys(keys);
        jwks
    }

    /// Full URL of the JWKS document.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Replace the served document with `document`.
    pub fn serve(&self, document: Value) {
        self.set(ResponseTemplate::new(200).set_body_json(document));
    }

    /// Replace the served document with the public JWKs of `keys`.
    pub fn serve_keys(&self, keys: &[&TestKeypair]) {
        self.serve(jwks_document(keys));
    }

    /// Serve `keys` after `delay`.
    pub fn serve_keys_delayed(&self, keys: &[&TestKeypair], delay: Duration) {
        self.set(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keys))
                .set_delay(delay),
        );
    }

    /// Answer every fetch with `status` and no document.
    pub fn fail_with(&self, status: u16) {
        self.set(ResponseTemplate::new(status));
    }

    /// Answer with a body that is not a key set.
    pub fn serve_garbage(&self) {
        self.set(ResponseTemplate::new(200).set_body_string("<html>not json</html>"));
    }

    /// Number of JWKS fetches received so far.
    pub fn fetch_count(&self) -> usize {
        self.responder.fetches.load(Ordering::SeqCst)
    }

    fn set(&self, response: ResponseTemplate) {
        *self.responder.current.lock().unwrap() = response;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_and_counts_fetches() {
        let key = TestKeypair::ed25519(1, "k1").unwrap();
        let jwks = MockJwksServer::with_keys(&[&key]).await;

        let body: Value = reqwest::get(jwks.url()).await.unwrap().json().await.unwrap();
        assert_eq!(body["keys"][0]["kid"], "k1");
        assert_eq!(jwks.fetch_count(), 1);

        jwks.fail_with(500);
        let status = reqwest::get(jwks.url()).await.unwrap().status();
        assert_eq!(status, 500);
        assert_eq!(jwks.fetch_count(), 2);
    }
}
