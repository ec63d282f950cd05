//! Payment provider client.
//!
//! The `PaymentGateway` trait is the seam between handlers and the remote
//! payment provider. `HttpPaymentGateway` talks JSON over HTTPS to the
//! provider's merchant API; `mock::MockPaymentGateway` keeps everything in
//! memory for tests.
//!
//! # Security
//!
//! - Requests authenticate with HTTP basic auth (merchant public/private key)
//! - The private key is held as a `SecretString` and never logged
//! - Provider error text is logged server-side, never returned to callers
//! - Timeouts prevent hanging connections

use crate::config::Config;
use crate::models::{Customer, Subscription};
use crate::observability::metrics::record_gateway_request;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, instrument, warn};

/// Upper bound for establishing a connection to the provider.
const GATEWAY_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Payment gateway errors.
///
/// Mapped into `ApiError` by the handlers: `NotFound` is 404, `Rejected` is
/// 409 and `Unavailable` is 503.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The referenced resource does not exist at the provider.
    #[error("{0} not found")]
    NotFound(String),

    /// The provider refused the operation (validation, decline, duplicate).
    #[error("Provider rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    /// The provider could not be reached or answered unexpectedly.
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    fn rejected(operation: &str, message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Metric label for this failure.
    fn metric_status(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Rejected { .. } => "rejected",
            GatewayError::Unavailable(_) => "error",
        }
    }
}

/// Operations the service needs from the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Look up a customer by ID.
    async fn find_customer(&self, customer_id: &str) -> Result<Customer, GatewayError>;

    /// Create a customer with a caller-chosen ID.
    async fn create_customer(&self, customer_id: &str, email: &str)
        -> Result<Customer, GatewayError>;

    /// Delete a customer. The provider also removes its payment methods and
    /// cancels its subscriptions.
    async fn delete_customer(&self, customer_id: &str) -> Result<(), GatewayError>;

    /// Vault a payment method for a customer from a client-side nonce.
    ///
    /// Returns the payment method token.
    async fn create_payment_method(
        &self,
        customer_id: &str,
        payment_method_nonce: &str,
        verify_card: bool,
    ) -> Result<String, GatewayError>;

    /// Look up a subscription by ID.
    async fn find_subscription(&self, subscription_id: &str)
        -> Result<Subscription, GatewayError>;

    /// Subscribe a vaulted payment method to a plan.
    async fn create_subscription(
        &self,
        payment_method_token: &str,
        plan_id: &str,
    ) -> Result<Subscription, GatewayError>;

    /// Cancel a subscription.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError>;

    /// Generate a client token, optionally bound to a customer.
    async fn generate_client_token(&self, customer_id: Option<&str>)
        -> Result<String, GatewayError>;
}

// ============================================================================
// Provider wire format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ProviderCustomer {
    id: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProviderCustomer> for Customer {
    fn from(customer: ProviderCustomer) -> Self {
        Customer {
            customer_id: customer.id,
            email: customer.email,
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CustomerEnvelope {
    customer: ProviderCustomer,
}

#[derive(Debug, Serialize)]
struct PaymentMethodOptions {
    verify_card: bool,
}

#[derive(Debug, Serialize)]
struct PaymentMethodParams<'a> {
    customer_id: &'a str,
    payment_method_nonce: &'a str,
    options: PaymentMethodOptions,
}

#[derive(Debug, Serialize)]
struct PaymentMethodRequest<'a> {
    payment_method: PaymentMethodParams<'a>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodEnvelope {
    payment_method: PaymentMethodToken,
}

#[derive(Debug, Serialize)]
struct SubscriptionParams<'a> {
    payment_method_token: &'a str,
    plan_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscriptionRequest<'a> {
    subscription: SubscriptionParams<'a>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEnvelope {
    subscription: Subscription,
}

#[derive(Debug, Serialize)]
struct ClientTokenParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ClientTokenRequest<'a> {
    client_token: ClientTokenParams<'a>,
}

#[derive(Debug, Deserialize)]
struct ClientTokenValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ClientTokenEnvelope {
    client_token: ClientTokenValue,
}

/// Body of a 422 answer from the provider.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: String,
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// HTTP client for the provider's merchant API.
pub struct HttpPaymentGateway {
    client: Client,
    /// `{api_url}/merchants/{merchant_id}`
    merchant_url: Url,
    public_key: String,
    private_key: SecretString,
}

impl HttpPaymentGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if the API URL is not a usable
    /// base URL or the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        merchant_id: &str,
        public_key: String,
        private_key: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let mut merchant_url = Url::parse(api_url).map_err(|e| {
            error!(target: "payments.services.gateway", error = %e, "Invalid payment API URL");
            GatewayError::Unavailable("Invalid payment API URL".to_string())
        })?;
        merchant_url
            .path_segments_mut()
            .map_err(|_| GatewayError::Unavailable("Invalid payment API URL".to_string()))?
            .pop_if_empty()
            .extend(["merchants", merchant_id]);

        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(GATEWAY_CONNECT_TIMEOUT.min(request_timeout))
            .build()
            .map_err(|e| {
                error!(target: "payments.services.gateway", error = %e, "Failed to build HTTP client");
                GatewayError::Unavailable("Failed to build HTTP client".to_string())
            })?;

        Ok(Self {
            client,
            merchant_url,
            public_key,
            private_key,
        })
    }

    /// Create a gateway client from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(
            &config.payment_api_url,
            &config.payment_merchant_id,
            config.payment_public_key.clone(),
            config.payment_private_key.clone(),
            config.payment_request_timeout,
        )
    }

    /// Build a URL below the merchant root. Segments are percent-encoded, so
    /// caller-supplied IDs cannot escape the resource path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.merchant_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Unavailable("Invalid payment API URL".to_string()))?
            .extend(segments);
        Ok(url)
    }

    /// Send one request and map the provider's status to a `GatewayError`.
    ///
    /// `resource` names the thing a 404 refers to.
    async fn send<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        resource: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, GatewayError> {
        let start = Instant::now();
        let result = self.dispatch(operation, resource, method, url, body).await;
        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.metric_status(),
        };
        record_gateway_request(operation, status, start.elapsed());
        result
    }

    async fn dispatch<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        resource: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.public_key, Some(self.private_key.expose_secret()))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(target: "payments.services.gateway", operation, error = %e, "Payment provider request failed");
            GatewayError::Unavailable("Payment provider is unreachable".to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(resource.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let message = response
                    .json::<ProviderErrorBody>()
                    .await
                    .map(|body| body.message)
                    .unwrap_or_default();
                Err(GatewayError::rejected(operation, message))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!(target: "payments.services.gateway", operation, status = %status, "Merchant credentials rejected by payment provider");
                Err(GatewayError::Unavailable(
                    "Merchant credentials rejected".to_string(),
                ))
            }
            _ => {
                warn!(target: "payments.services.gateway", operation, status = %status, "Unexpected payment provider response");
                Err(GatewayError::Unavailable(format!(
                    "Payment provider returned {status}"
                )))
            }
        }
    }

    async fn parse<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        response.json::<T>().await.map_err(|e| {
            error!(target: "payments.services.gateway", operation, error = %e, "Failed to parse payment provider response");
            GatewayError::Unavailable("Invalid payment provider response".to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip_all, fields(customer_id = %customer_id))]
    async fn find_customer(&self, customer_id: &str) -> Result<Customer, GatewayError> {
        let url = self.endpoint(&["customers", customer_id])?;
        let response = self
            .send::<()>("find_customer", "Customer", Method::GET, url, None)
            .await?;
        let envelope: CustomerEnvelope = Self::parse("find_customer", response).await?;
        Ok(envelope.customer.into())
    }

    #[instrument(skip_all, fields(customer_id = %customer_id))]
    async fn create_customer(
        &self,
        customer_id: &str,
        email: &str,
    ) -> Result<Customer, GatewayError> {
        let url = self.endpoint(&["customers"])?;
        let body = CustomerEnvelope {
            customer: ProviderCustomer {
                id: customer_id.to_string(),
                email: email.to_string(),
                created_at: None,
                updated_at: None,
            },
        };
        let response = self
            .send("create_customer", "Customer", Method::POST, url, Some(&body))
            .await?;
        let envelope: CustomerEnvelope = Self::parse("create_customer", response).await?;
        Ok(envelope.customer.into())
    }

    #[instrument(skip_all, fields(customer_id = %customer_id))]
    async fn delete_customer(&self, customer_id: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["customers", customer_id])?;
        self.send::<()>("delete_customer", "Customer", Method::DELETE, url, None)
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(customer_id = %customer_id, verify_card = verify_card))]
    async fn create_payment_method(
        &self,
        customer_id: &str,
        payment_method_nonce: &str,
        verify_card: bool,
    ) -> Result<String, GatewayError> {
        let url = self.endpoint(&["payment_methods"])?;
        let body = PaymentMethodRequest {
            payment_method: PaymentMethodParams {
                customer_id,
                payment_method_nonce,
                options: PaymentMethodOptions { verify_card },
            },
        };
        let response = self
            .send(
                "create_payment_method",
                "Customer",
                Method::POST,
                url,
                Some(&body),
            )
            .await?;
        let envelope: PaymentMethodEnvelope =
            Self::parse("create_payment_method", response).await?;
        Ok(envelope.payment_method.token)
    }

    #[instrument(skip_all, fields(subscription_id = %subscription_id))]
    async fn find_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, GatewayError> {
        let url = self.endpoint(&["subscriptions", subscription_id])?;
        let response = self
            .send::<()>("find_subscription", "Subscription", Method::GET, url, None)
            .await?;
        let envelope: SubscriptionEnvelope = Self::parse("find_subscription", response).await?;
        Ok(envelope.subscription)
    }

    #[instrument(skip_all, fields(plan_id = %plan_id))]
    async fn create_subscription(
        &self,
        payment_method_token: &str,
        plan_id: &str,
    ) -> Result<Subscription, GatewayError> {
        let url = self.endpoint(&["subscriptions"])?;
        let body = SubscriptionRequest {
            subscription: SubscriptionParams {
                payment_method_token,
                plan_id,
            },
        };
        let response = self
            .send(
                "create_subscription",
                "Payment method",
                Method::POST,
                url,
                Some(&body),
            )
            .await?;
        let envelope: SubscriptionEnvelope =
            Self::parse("create_subscription", response).await?;
        Ok(envelope.subscription)
    }

    #[instrument(skip_all, fields(subscription_id = %subscription_id))]
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["subscriptions", subscription_id, "cancel"])?;
        self.send::<()>(
            "cancel_subscription",
            "Subscription",
            Method::PUT,
            url,
            None,
        )
        .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(customer_id = ?customer_id))]
    async fn generate_client_token(
        &self,
        customer_id: Option<&str>,
    ) -> Result<String, GatewayError> {
        let url = self.endpoint(&["client_token"])?;
        let body = ClientTokenRequest {
            client_token: ClientTokenParams { customer_id },
        };
        let response = self
            .send(
                "generate_client_token",
                "Customer",
                Method::POST,
                url,
                Some(&body),
            )
            .await?;
        let envelope: ClientTokenEnvelope =
            Self::parse("generate_client_token", response).await?;
        Ok(envelope.client_token.value)
    }
}

/// Mock payment gateway module for testing.
///
/// This module provides an in-memory gateway for use in tests.
pub mod mock {
    use super::*;
    use crate::models::SubscriptionStatus;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Nonce the mock declines during card verification.
    pub const DECLINED_NONCE: &str = "fake-processor-declined-visa-nonce";

    #[derive(Debug, Clone)]
    enum Mode {
        Normal,
        Failing,
        Rejecting(String),
    }

    #[derive(Default)]
    struct Vault {
        customers: HashMap<String, Customer>,
        /// Payment method token -> owning customer ID.
        payment_methods: HashMap<String, String>,
        subscriptions: HashMap<String, Subscription>,
    }

    /// In-memory payment gateway.
    pub struct MockPaymentGateway {
        vault: Mutex<Vault>,
        mode: Mode,
        /// Number of calls made.
        call_count: AtomicUsize,
        /// Sequence for generated IDs.
        sequence: AtomicUsize,
    }

    impl Default for MockPaymentGateway {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockPaymentGateway {
        /// Create an empty gateway that behaves like a healthy provider.
        pub fn new() -> Self {
            Self::with_mode(Mode::Normal)
        }

        /// Create a gateway whose every call fails as unavailable.
        pub fn failing() -> Self {
            Self::with_mode(Mode::Failing)
        }

        /// Create a gateway that rejects every call with `message`.
        pub fn rejecting(message: &str) -> Self {
            Self::with_mode(Mode::Rejecting(message.to_string()))
        }

        fn with_mode(mode: Mode) -> Self {
            Self {
                vault: Mutex::new(Vault::default()),
                mode,
                call_count: AtomicUsize::new(0),
                sequence: AtomicUsize::new(0),
            }
        }

        /// Seed a customer.
        pub fn with_customer(mut self, customer_id: &str, email: &str) -> Self {
            self.vault.get_mut().customers.insert(
                customer_id.to_string(),
                Customer {
                    customer_id: customer_id.to_string(),
                    email: email.to_string(),
                    created_at: Some(Utc::now()),
                    updated_at: Some(Utc::now()),
                },
            );
            self
        }

        /// Seed an active subscription charging `payment_method_token`.
        pub fn with_subscription(
            mut self,
            subscription_id: &str,
            plan_id: &str,
            payment_method_token: &str,
        ) -> Self {
            self.vault.get_mut().subscriptions.insert(
                subscription_id.to_string(),
                active_subscription(subscription_id, plan_id, payment_method_token),
            );
            self
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Whether a customer exists in the vault.
        pub async fn has_customer(&self, customer_id: &str) -> bool {
            self.vault.lock().await.customers.contains_key(customer_id)
        }

        /// Current status of a stored subscription.
        pub async fn subscription_status(
            &self,
            subscription_id: &str,
        ) -> Option<SubscriptionStatus> {
            self.vault
                .lock()
                .await
                .subscriptions
                .get(subscription_id)
                .map(|s| s.status)
        }

        fn next_id(&self, prefix: &str) -> String {
            let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            format!("{prefix}-{n}")
        }

        /// Count the call and apply the failure mode.
        fn begin(&self, operation: &str) -> Result<(), GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                Mode::Normal => Ok(()),
                Mode::Failing => Err(GatewayError::Unavailable(
                    "Mock payment gateway error".to_string(),
                )),
                Mode::Rejecting(message) => Err(GatewayError::rejected(operation, message.clone())),
            }
        }
    }

    /// Build an active subscription with no trial.
    pub fn active_subscription(
        subscription_id: &str,
        plan_id: &str,
        payment_method_token: &str,
    ) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: subscription_id.to_string(),
            plan_id: plan_id.to_string(),
            status: SubscriptionStatus::Active,
            price: Some("10.00".to_string()),
            balance: Some("0.00".to_string()),
            billing_day_of_month: Some(1),
            current_billing_cycle: 1,
            days_past_due: 0,
            payment_method_token: payment_method_token.to_string(),
            trial_duration: 0,
            trial_duration_unit: "day".to_string(),
            trial_period: false,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    #[async_trait]
    impl PaymentGateway for MockPaymentGateway {
        async fn find_customer(&self, customer_id: &str) -> Result<Customer, GatewayError> {
            self.begin("find_customer")?;
            self.vault
                .lock()
                .await
                .customers
                .get(customer_id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound("Customer".to_string()))
        }

        async fn create_customer(
            &self,
            customer_id: &str,
            email: &str,
        ) -> Result<Customer, GatewayError> {
            self.begin("create_customer")?;
            let mut vault = self.vault.lock().await;
            if vault.customers.contains_key(customer_id) {
                return Err(GatewayError::rejected(
                    "create_customer",
                    "Customer ID has already been taken",
                ));
            }
            let now = Utc::now();
            let customer = Customer {
                customer_id: customer_id.to_string(),
                email: email.to_string(),
                created_at: Some(now),
                updated_at: Some(now),
            };
            vault
                .customers
                .insert(customer_id.to_string(), customer.clone());
            Ok(customer)
        }

        async fn delete_customer(&self, customer_id: &str) -> Result<(), GatewayError> {
            self.begin("delete_customer")?;
            let mut vault = self.vault.lock().await;
            if vault.customers.remove(customer_id).is_none() {
                return Err(GatewayError::NotFound("Customer".to_string()));
            }

            let tokens: Vec<String> = vault
                .payment_methods
                .iter()
                .filter(|(_, owner)| owner.as_str() == customer_id)
                .map(|(token, _)| token.clone())
                .collect();
            for token in &tokens {
                vault.payment_methods.remove(token);
            }
            for subscription in vault.subscriptions.values_mut() {
                if tokens.contains(&subscription.payment_method_token) {
                    subscription.status = SubscriptionStatus::Canceled;
                }
            }
            Ok(())
        }

        async fn create_payment_method(
            &self,
            customer_id: &str,
            payment_method_nonce: &str,
            verify_card: bool,
        ) -> Result<String, GatewayError> {
            self.begin("create_payment_method")?;
            let mut vault = self.vault.lock().await;
            if !vault.customers.contains_key(customer_id) {
                return Err(GatewayError::NotFound("Customer".to_string()));
            }
            if verify_card && payment_method_nonce == DECLINED_NONCE {
                return Err(GatewayError::rejected(
                    "create_payment_method",
                    "Do Not Honor",
                ));
            }
            let token = self.next_id("pm");
            vault
                .payment_methods
                .insert(token.clone(), customer_id.to_string());
            Ok(token)
        }

        async fn find_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<Subscription, GatewayError> {
            self.begin("find_subscription")?;
            self.vault
                .lock()
                .await
                .subscriptions
                .get(subscription_id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound("Subscription".to_string()))
        }

        async fn create_subscription(
            &self,
            payment_method_token: &str,
            plan_id: &str,
        ) -> Result<Subscription, GatewayError> {
            self.begin("create_subscription")?;
            let mut vault = self.vault.lock().await;
            if !vault.payment_methods.contains_key(payment_method_token) {
                return Err(GatewayError::rejected(
                    "create_subscription",
                    "Payment method token is invalid",
                ));
            }
            let subscription =
                active_subscription(&self.next_id("sub"), plan_id, payment_method_token);
            vault
                .subscriptions
                .insert(subscription.id.clone(), subscription.clone());
            Ok(subscription)
        }

        async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
            self.begin("cancel_subscription")?;
            let mut vault = self.vault.lock().await;
            let subscription = vault
                .subscriptions
                .get_mut(subscription_id)
                .ok_or_else(|| GatewayError::NotFound("Subscription".to_string()))?;
            if subscription.status == SubscriptionStatus::Canceled {
                return Err(GatewayError::rejected(
                    "cancel_subscription",
                    "Subscription has already been canceled",
                ));
            }
            subscription.status = SubscriptionStatus::Canceled;
            subscription.updated_at = Some(Utc::now());
            Ok(())
        }

        async fn generate_client_token(
            &self,
            customer_id: Option<&str>,
        ) -> Result<String, GatewayError> {
            self.begin("generate_client_token")?;
            if let Some(customer_id) = customer_id {
                if !self.vault.lock().await.customers.contains_key(customer_id) {
                    return Err(GatewayError::NotFound("Customer".to_string()));
                }
            }
            Ok(self.next_id("client-token"))
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_customer_lifecycle() {
            let mock = MockPaymentGateway::new();

            let created = mock
                .create_customer("cus-1", "a@example.com")
                .await
                .unwrap();
            assert_eq!(created.customer_id, "cus-1");

            let found = mock.find_customer("cus-1").await.unwrap();
            assert_eq!(found.email, "a@example.com");

            mock.delete_customer("cus-1").await.unwrap();
            assert_eq!(
                mock.find_customer("cus-1").await,
                Err(GatewayError::NotFound("Customer".to_string()))
            );
            assert_eq!(mock.call_count(), 4);
        }

        #[tokio::test]
        async fn test_mock_duplicate_customer_rejected() {
            let mock = MockPaymentGateway::new().with_customer("cus-1", "a@example.com");
            let result = mock.create_customer("cus-1", "b@example.com").await;
            assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        }

        #[tokio::test]
        async fn test_mock_subscription_flow() {
            let mock = MockPaymentGateway::new().with_customer("cus-1", "a@example.com");

            let token = mock
                .create_payment_method("cus-1", "fake-valid-nonce", true)
                .await
                .unwrap();
            let subscription = mock.create_subscription(&token, "gold").await.unwrap();
            assert_eq!(subscription.status, SubscriptionStatus::Active);
            assert_eq!(subscription.payment_method_token, token);

            mock.cancel_subscription(&subscription.id).await.unwrap();
            assert_eq!(
                mock.subscription_status(&subscription.id).await,
                Some(SubscriptionStatus::Canceled)
            );

            // Second cancel is refused by the provider
            let again = mock.cancel_subscription(&subscription.id).await;
            assert!(matches!(again, Err(GatewayError::Rejected { .. })));
        }

        #[tokio::test]
        async fn test_mock_declined_nonce() {
            let mock = MockPaymentGateway::new().with_customer("cus-1", "a@example.com");
            let result = mock
                .create_payment_method("cus-1", DECLINED_NONCE, true)
                .await;
            assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        }

        #[tokio::test]
        async fn test_mock_delete_customer_cancels_subscriptions() {
            let mock = MockPaymentGateway::new().with_customer("cus-1", "a@example.com");
            let token = mock
                .create_payment_method("cus-1", "fake-valid-nonce", true)
                .await
                .unwrap();
            let subscription = mock.create_subscription(&token, "gold").await.unwrap();

            mock.delete_customer("cus-1").await.unwrap();
            assert_eq!(
                mock.subscription_status(&subscription.id).await,
                Some(SubscriptionStatus::Canceled)
            );
        }

        #[tokio::test]
        async fn test_mock_client_token_unknown_customer() {
            let mock = MockPaymentGateway::new();
            assert!(mock.generate_client_token(None).await.is_ok());
            assert_eq!(
                mock.generate_client_token(Some("cus-missing")).await,
                Err(GatewayError::NotFound("Customer".to_string()))
            );
        }

        #[tokio::test]
        async fn test_mock_failing() {
            let mock = MockPaymentGateway::failing().with_customer("cus-1", "a@example.com");
            let result = mock.find_customer("cus-1").await;
            assert!(matches!(result, Err(GatewayError::Unavailable(_))));
            assert_eq!(mock.call_count(), 1);
        }

        #[tokio::test]
        async fn test_mock_rejecting() {
            let mock = MockPaymentGateway::rejecting("Gateway Rejected: fraud");
            let result = mock.create_customer("cus-1", "a@example.com").await;
            assert_eq!(
                result,
                Err(GatewayError::Rejected {
                    operation: "create_customer".to_string(),
                    message: "Gateway Rejected: fraud".to_string(),
                })
            );
        }
    }
}
