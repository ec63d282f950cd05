//! Client token endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use payments_service::services::gateway::mock::MockPaymentGateway;
use payments_test_utils::*;
use serde_json::Value;
use std::sync::Arc;

async fn spawn(gateway: MockPaymentGateway) -> Result<(TestKeypair, MockJwksServer, TestPaymentsServer)> {
    let key = TestKeypair::rsa("client-token-tests")?;
    let jwks = MockJwksServer::with_keys(&[&key]).await;
    let server = TestPaymentsServer::spawn(&jwks.url(), Arc::new(gateway)).await?;
    Ok((key, jwks, server))
}

async fn get(server: &TestPaymentsServer, key: &TestKeypair, path: &str, subject: &str) -> Result<reqwest::Response> {
    let token = TestTokenBuilder::new().for_subject(subject).sign(key);
    Ok(reqwest::Client::new()
        .get(format!("{}{}", server.url(), path))
        .bearer_auth(token)
        .send()
        .await?)
}

#[tokio::test]
async fn test_anonymous_client_token() -> Result<()> {
    let (key, _jwks, server) = spawn(MockPaymentGateway::new()).await?;

    let response = get(&server, &key, "/client-token", "auth0|anyone").await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert!(!body["token"].as_str().unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_client_token_requires_authentication() -> Result<()> {
    let (_key, _jwks, server) = spawn(MockPaymentGateway::new()).await?;

    let response = reqwest::get(format!("{}/client-token", server.url())).await?;

    assert_eq!(response.status(), 401);
    assert_eq!(server.gateway().call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_customer_client_token() -> Result<()> {
    let gateway = MockPaymentGateway::new().with_customer("cus-1", "one@example.com");
    let (key, _jwks, server) = spawn(gateway).await?;

    let own = get(&server, &key, "/client-token/cus-1", "auth0|cus-1").await?;
    assert_eq!(own.status(), 200);

    let service = get(&server, &key, "/client-token/cus-1", TEST_SERVICE_ACCOUNT).await?;
    assert_eq!(service.status(), 200);

    let other = get(&server, &key, "/client-token/cus-1", "auth0|cus-2").await?;
    assert_eq!(other.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_customer_client_token_unknown_customer() -> Result<()> {
    let (key, _jwks, server) = spawn(MockPaymentGateway::new()).await?;

    let response = get(&server, &key, "/client-token/cus-404", TEST_SERVICE_ACCOUNT).await?;

    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_provider_rejection_conflicts() -> Result<()> {
    let (key, _jwks, server) = spawn(MockPaymentGateway::rejecting("Merchant account suspended")).await?;

    let response = get(&server, &key, "/client-token", "auth0|anyone").await?;

    assert_eq!(response.status(), 409);
    let body = response.text().await?;
    assert!(!body.contains("suspended"));
    Ok(())
}
