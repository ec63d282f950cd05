//! Customer handlers.
//!
//! - `POST /customer` - Create a customer
//! - `GET /customer/{customer_id}` - Retrieve a customer
//! - `DELETE /customer/{customer_id}` - Delete a customer
//!
//! # Security
//!
//! Every operation requires a verified token whose subject owns the customer
//! (or is a configured service account).

use crate::auth::TokenClaims;
use crate::errors::ApiError;
use crate::handlers::authorize_customer;
use crate::models::{CreateCustomerRequest, Customer};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Handler for POST /customer
///
/// # Response
///
/// - 201 Created: Customer created
/// - 400 Bad Request: Malformed JSON or blank fields
/// - 403 Forbidden: Caller does not own `customer_id`
/// - 409 Conflict: Provider refused (for example a duplicate ID)
/// - 422 Unprocessable Entity: Missing or unknown fields
#[instrument(skip_all, name = "payments.handlers.customers.create")]
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(request) = payload?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    authorize_customer(
        &claims,
        &request.customer_id,
        &state.config.auth_service_accounts,
    )?;

    info!(target: "payments.handlers.customers", customer_id = %request.customer_id, "Creating customer");

    let customer = state
        .gateway
        .create_customer(&request.customer_id, &request.email)
        .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

/// Handler for GET /customer/{customer_id}
///
/// # Response
///
/// - 200 OK: Customer returned
/// - 403 Forbidden: Caller does not own the customer
/// - 404 Not Found: No such customer
#[instrument(skip(state, claims), name = "payments.handlers.customers.get")]
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    Path(customer_id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    authorize_customer(&claims, &customer_id, &state.config.auth_service_accounts)?;

    let customer = state.gateway.find_customer(&customer_id).await?;

    Ok(Json(customer))
}

/// Handler for DELETE /customer/{customer_id}
///
/// The provider also removes the customer's payment methods and cancels
/// its subscriptions.
///
/// # Response
///
/// - 204 No Content: Customer deleted
/// - 403 Forbidden: Caller does not own the customer
/// - 404 Not Found: No such customer
/// - 409 Conflict: Provider refused the deletion
#[instrument(skip(state, claims), name = "payments.handlers.customers.delete")]
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    Path(customer_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize_customer(&claims, &customer_id, &state.config.auth_service_accounts)?;

    info!(target: "payments.handlers.customers", customer_id = %customer_id, "Deleting customer");

    state.gateway.delete_customer(&customer_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{app_state, claims_for};
    use crate::services::gateway::mock::MockPaymentGateway;

    #[tokio::test]
    async fn test_get_own_customer() {
        let state = app_state(MockPaymentGateway::new().with_customer("cus-1", "a@example.com"));

        let Json(customer) = get_customer(
            State(state),
            Extension(claims_for("auth0|cus-1")),
            Path("cus-1".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(customer.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_get_foreign_customer_is_forbidden() {
        let gateway = Arc::new(MockPaymentGateway::new().with_customer("cus-2", "b@example.com"));
        let state = crate::handlers::test_support::app_state_with(gateway.clone());

        let err = get_customer(
            State(state),
            Extension(claims_for("auth0|cus-1")),
            Path("cus-2".to_string()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 403);
        // Denied before the provider is called
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_customer_blank_email_is_400() {
        let state = app_state(MockPaymentGateway::new());
        let request = CreateCustomerRequest {
            customer_id: "cus-1".to_string(),
            email: " ".to_string(),
        };

        let err = create_customer(
            State(state),
            Extension(claims_for("cus-1")),
            Ok(Json(request)),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_delete_missing_customer_is_404() {
        let state = app_state(MockPaymentGateway::new());

        let err = delete_customer(
            State(state),
            Extension(claims_for("cus-9")),
            Path("cus-9".to_string()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 404);
    }
}
