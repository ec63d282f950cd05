//! Client token handlers.
//!
//! Client tokens let a browser or mobile SDK talk to the provider directly
//! to tokenize card details into a nonce.

use crate::auth::TokenClaims;
use crate::errors::ApiError;
use crate::handlers::authorize_customer;
use crate::models::ClientTokenResponse;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /client-token
///
/// Generates a client token not bound to a customer.
#[instrument(skip_all, name = "payments.handlers.client_tokens.generate")]
pub async fn generate_client_token(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClientTokenResponse>, ApiError> {
    let token = state.gateway.generate_client_token(None).await?;

    Ok(Json(ClientTokenResponse { token }))
}

/// Handler for GET /client-token/{customer_id}
///
/// Generates a client token bound to a customer, so the SDK can show the
/// customer's vaulted payment methods.
///
/// # Response
///
/// - 200 OK: Token returned
/// - 403 Forbidden: Caller does not own the customer
/// - 404 Not Found: No such customer
#[instrument(skip(state, claims), name = "payments.handlers.client_tokens.generate_for_customer")]
pub async fn generate_customer_client_token(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    Path(customer_id): Path<String>,
) -> Result<Json<ClientTokenResponse>, ApiError> {
    authorize_customer(&claims, &customer_id, &state.config.auth_service_accounts)?;

    let token = state
        .gateway
        .generate_client_token(Some(&customer_id))
        .await?;

    Ok(Json(ClientTokenResponse { token }))
}
