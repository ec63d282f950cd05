//! Payments service models.
//!
//! Request bodies, response bodies and the resource types shared between
//! handlers and the payment gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response.
///
/// Returned by the `/ping` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Always "OK" while the process is serving requests.
    pub status: String,
}

impl PingResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

// ============================================================================
// Customers
// ============================================================================

/// Request to create a customer.
///
/// Sent to `POST /customer`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCustomerRequest {
    /// Caller-chosen customer ID, also used for ownership checks.
    pub customer_id: String,

    /// Customer email address.
    pub email: String,
}

impl CreateCustomerRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if a required field is blank.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.customer_id.trim().is_empty() {
            return Err("customer_id must not be empty");
        }

        if self.email.trim().is_empty() {
            return Err("email must not be empty");
        }

        Ok(())
    }
}

/// Customer as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID in the provider's vault.
    pub customer_id: String,

    /// Customer email address.
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Request to create a payment method and subscribe it to a plan.
///
/// Sent to `POST /subscription`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubscriptionRequest {
    /// One-time nonce produced by the client-side payment SDK.
    pub payment_method_nonce: String,

    /// Customer that will own the payment method.
    pub customer_id: String,

    /// Plan to subscribe to.
    pub plan_id: String,
}

impl CreateSubscriptionRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if a required field is blank.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.payment_method_nonce.trim().is_empty() {
            return Err("payment_method_nonce must not be empty");
        }

        if self.customer_id.trim().is_empty() {
            return Err("customer_id must not be empty");
        }

        if self.plan_id.trim().is_empty() {
            return Err("plan_id must not be empty");
        }

        Ok(())
    }
}

/// Subscription lifecycle state as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Expired,
    #[serde(rename = "Past Due")]
    PastDue,
    Pending,
}

impl SubscriptionStatus {
    /// Returns the provider's string for the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Canceled => "Canceled",
            SubscriptionStatus::Expired => "Expired",
            SubscriptionStatus::PastDue => "Past Due",
            SubscriptionStatus::Pending => "Pending",
        }
    }
}

/// Subscription as returned to callers.
///
/// Amounts are decimal strings so no precision is lost in transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID in the provider's vault.
    pub id: String,

    pub plan_id: String,

    pub status: SubscriptionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_day_of_month: Option<u8>,

    pub current_billing_cycle: u32,

    pub days_past_due: u32,

    /// Token of the payment method the subscription charges.
    pub payment_method_token: String,

    pub trial_duration: u32,

    /// "day" or "month".
    pub trial_duration_unit: String,

    pub trial_period: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Client tokens
// ============================================================================

/// Client token for the browser/mobile payment SDK.
///
/// Returned by `GET /client-token` and `GET /client-token/{customer_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTokenResponse {
    pub token: String,
}
