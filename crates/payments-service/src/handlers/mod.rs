//! HTTP request handlers for the payments service.

pub mod client_tokens;
pub mod customers;
pub mod metrics;
pub mod ping;
pub mod subscriptions;

pub use client_tokens::{generate_client_token, generate_customer_client_token};
pub use customers::{create_customer, delete_customer, get_customer};
pub use metrics::metrics_handler;
pub use ping::ping;
pub use subscriptions::{cancel_subscription, create_subscription, get_subscription};

use crate::auth::TokenClaims;
use crate::errors::ApiError;

/// Check that the caller may act on `customer_id`.
///
/// # Errors
///
/// Returns `ApiError::Forbidden` when the subject neither owns the customer
/// nor is a configured service account.
pub(crate) fn authorize_customer(
    claims: &TokenClaims,
    customer_id: &str,
    service_accounts: &[String],
) -> Result<(), ApiError> {
    if claims.may_access_customer(customer_id, service_accounts) {
        return Ok(());
    }

    tracing::warn!(
        target: "payments.handlers.authz",
        customer_id = %customer_id,
        "Caller is not authorized for customer"
    );
    Err(ApiError::Forbidden(
        "Not authorized to access this customer".to_string(),
    ))
}
