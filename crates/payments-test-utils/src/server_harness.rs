//! Test server harness for E2E testing
//!
//! Provides `TestPaymentsServer` for spawning real payments server instances
//! in tests, wired to a mock JWKS endpoint and an in-memory payment gateway.

use crate::token_builders::{TEST_AUDIENCE, TEST_ISSUER, TEST_SERVICE_ACCOUNT};
use metrics_exporter_prometheus::PrometheusBuilder;
use payments_service::auth::KeyResolver;
use payments_service::config::Config;
use payments_service::routes::{self, AppState};
use payments_service::services::gateway::mock::MockPaymentGateway;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the payments server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_ping() -> Result<()> {
///     let jwks = MockJwksServer::with_keys(&[&keypair]).await;
///     let server = TestPaymentsServer::spawn(&jwks.url(), Arc::new(MockPaymentGateway::new())).await?;
///
///     let response = reqwest::get(format!("{}/ping", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestPaymentsServer {
    addr: SocketAddr,
    config: Config,
    gateway: Arc<MockPaymentGateway>,
    key_resolver: Arc<KeyResolver>,
    _handle: JoinHandle<()>,
}

impl TestPaymentsServer {
    /// Spawn a new test server instance.
    ///
    /// The server will:
    /// - Accept RS256, ES256 and EdDSA tokens from `TEST_ISSUER` for `TEST_AUDIENCE`
    /// - Treat `TEST_SERVICE_ACCOUNT` as a service account
    /// - Warm its key cache from `jwks_url` before returning
    /// - Bind to a random available port (127.0.0.1:0)
    pub async fn spawn(
        jwks_url: &str,
        gateway: Arc<MockPaymentGateway>,
    ) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(jwks_url, gateway, &[]).await
    }

    /// Spawn with extra or overriding configuration variables.
    pub async fn spawn_with_vars(
        jwks_url: &str,
        gateway: Arc<MockPaymentGateway>,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("AUTH_JWKS_URL".to_string(), jwks_url.to_string()),
            ("AUTH_ALGORITHMS".to_string(), "RS256,ES256,EdDSA".to_string()),
            (
                "AUTH_SERVICE_ACCOUNTS".to_string(),
                TEST_SERVICE_ACCOUNT.to_string(),
            ),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "1".to_string()),
            ("PAYMENT_MERCHANT_ID".to_string(), "test-merchant".to_string()),
            ("PAYMENT_PUBLIC_KEY".to_string(), "test-public-key".to_string()),
            (
                "PAYMENT_PRIVATE_KEY".to_string(),
                "test-private-key".to_string(),
            ),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let auth_state = routes::build_auth_state(&config);
        let key_resolver = Arc::clone(auth_state.verifier.key_resolver());
        key_resolver.init().await;

        let state = Arc::new(AppState {
            config: config.clone(),
            gateway: gateway.clone(),
        });

        // Never installed globally, so parallel test servers do not collide
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, auth_state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            gateway,
            key_resolver,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The in-memory gateway backing the server.
    pub fn gateway(&self) -> &MockPaymentGateway {
        &self.gateway
    }

    /// The key resolver the server verifies tokens with.
    pub fn key_resolver(&self) -> &Arc<KeyResolver> {
        &self.key_resolver
    }
}

impl Drop for TestPaymentsServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
