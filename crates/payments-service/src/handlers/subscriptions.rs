//! Subscription handlers.
//!
//! - `POST /subscription` - Vault a payment method and subscribe it to a plan
//! - `GET /subscription/{subscription_id}` - Retrieve a subscription
//! - `DELETE /subscription/{subscription_id}` - Cancel a subscription
//!
//! # Security
//!
//! Creation is checked against the body's `customer_id`. Retrieval and
//! cancellation require a verified token only: subscriptions are addressed
//! by provider-issued IDs that do not name a customer.

use crate::auth::TokenClaims;
use crate::errors::ApiError;
use crate::handlers::authorize_customer;
use crate::models::{CreateSubscriptionRequest, Subscription};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Handler for POST /subscription
///
/// Steps, each failing fast:
/// 1. Customer must exist (404)
/// 2. Payment method is created from the nonce with card verification (409)
/// 3. Subscription is created on the new payment method (409)
///
/// # Response
///
/// - 201 Created: Subscription created
/// - 400 Bad Request: Malformed JSON or blank fields
/// - 403 Forbidden: Caller does not own `customer_id`
/// - 404 Not Found: No such customer
/// - 409 Conflict: Card declined or plan refused
/// - 422 Unprocessable Entity: Missing or unknown fields
#[instrument(skip_all, name = "payments.handlers.subscriptions.create")]
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    payload: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let Json(request) = payload?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    authorize_customer(
        &claims,
        &request.customer_id,
        &state.config.auth_service_accounts,
    )?;

    info!(
        target: "payments.handlers.subscriptions",
        customer_id = %request.customer_id,
        plan_id = %request.plan_id,
        "Creating subscription"
    );

    state.gateway.find_customer(&request.customer_id).await?;

    let payment_method_token = state
        .gateway
        .create_payment_method(&request.customer_id, &request.payment_method_nonce, true)
        .await?;

    let subscription = state
        .gateway
        .create_subscription(&payment_method_token, &request.plan_id)
        .await?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Handler for GET /subscription/{subscription_id}
///
/// # Response
///
/// - 200 OK: Subscription returned
/// - 404 Not Found: No such subscription
#[instrument(skip(state, _claims), name = "payments.handlers.subscriptions.get")]
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<TokenClaims>,
    Path(subscription_id): Path<String>,
) -> Result<Json<Subscription>, ApiError> {
    let subscription = state.gateway.find_subscription(&subscription_id).await?;

    Ok(Json(subscription))
}

/// Handler for DELETE /subscription/{subscription_id}
///
/// # Response
///
/// - 204 No Content: Subscription canceled
/// - 404 Not Found: No such subscription
/// - 409 Conflict: Provider refused (for example already canceled)
#[instrument(skip(state, _claims), name = "payments.handlers.subscriptions.cancel")]
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<TokenClaims>,
    Path(subscription_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!(target: "payments.handlers.subscriptions", subscription_id = %subscription_id, "Canceling subscription");

    state.gateway.cancel_subscription(&subscription_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
