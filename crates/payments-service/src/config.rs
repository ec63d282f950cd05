//! Payments service configuration.
//!
//! Configuration is loaded from environment variables. The merchant private
//! key is held as a `SecretString` and redacted in Debug output.

use common::jwt::{parse_asymmetric_algorithm, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS cache freshness window in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Default payment provider request timeout in seconds.
pub const DEFAULT_PAYMENT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default graceful-shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Paths served without authentication unless overridden.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/ping", "/metrics"];

/// Payment provider environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEnvironment {
    Sandbox,
    Production,
}

impl PaymentEnvironment {
    /// Provider API base URL for this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            PaymentEnvironment::Sandbox => "https://api.sandbox.braintreegateway.com",
            PaymentEnvironment::Production => "https://api.braintreegateway.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentEnvironment::Sandbox => "sandbox",
            PaymentEnvironment::Production => "production",
        }
    }
}

/// Payments service configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected `iss` claim (exact match).
    pub auth_issuer: String,

    /// Accepted `aud` values; a token must carry at least one.
    pub auth_audiences: Vec<String>,

    /// URL to the identity provider's JWKS endpoint.
    pub auth_jwks_url: String,

    /// Accepted signature algorithms (asymmetric only).
    pub auth_algorithms: Vec<Algorithm>,

    /// Paths served without authentication.
    pub auth_excluded_paths: Vec<String>,

    /// Subjects allowed to act on any customer.
    pub auth_service_accounts: Vec<String>,

    /// Tolerance for `iat` values in the future.
    pub jwt_clock_skew: Duration,

    /// How long a fetched JWKS is served without refetching.
    pub jwks_cache_ttl: Duration,

    /// Timeout for one JWKS fetch.
    pub jwks_fetch_timeout: Duration,

    /// Payment provider environment.
    pub payment_environment: PaymentEnvironment,

    /// Payment provider base URL.
    pub payment_api_url: String,

    /// Merchant ID at the payment provider.
    pub payment_merchant_id: String,

    /// Merchant public key (basic-auth user).
    pub payment_public_key: String,

    /// Merchant private key (basic-auth password).
    /// Protected by `SecretString` to prevent accidental logging.
    pub payment_private_key: SecretString,

    /// Timeout for one payment provider request.
    pub payment_request_timeout: Duration,

    /// Graceful-shutdown drain period.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("auth_issuer", &self.auth_issuer)
            .field("auth_audiences", &self.auth_audiences)
            .field("auth_jwks_url", &self.auth_jwks_url)
            .field("auth_algorithms", &self.auth_algorithms)
            .field("auth_excluded_paths", &self.auth_excluded_paths)
            .field("auth_service_accounts", &self.auth_service_accounts)
            .field("jwt_clock_skew", &self.jwt_clock_skew)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("payment_environment", &self.payment_environment)
            .field("payment_api_url", &self.payment_api_url)
            .field("payment_merchant_id", &self.payment_merchant_id)
            .field("payment_public_key", &self.payment_public_key)
            .field("payment_private_key", &"[REDACTED]")
            .field("payment_request_timeout", &self.payment_request_timeout)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid auth configuration: {0}")]
    InvalidAuth(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),

    #[error("Invalid payment provider configuration: {0}")]
    InvalidPayment(String),
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Parse a positive number of seconds, or return the default.
fn positive_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{name} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidDuration(format!(
            "{name} must be greater than 0"
        )));
    }

    Ok(value)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Auth
        let auth_issuer = required(vars, "AUTH_ISSUER")?;

        let auth_audiences = parse_list(&required(vars, "AUTH_AUDIENCE")?);
        if auth_audiences.is_empty() {
            return Err(ConfigError::InvalidAuth(
                "AUTH_AUDIENCE must list at least one audience".to_string(),
            ));
        }

        let auth_jwks_url = vars.get("AUTH_JWKS_URL").cloned().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                auth_issuer.trim_end_matches('/')
            )
        });

        let auth_algorithms = match vars.get("AUTH_ALGORITHMS") {
            Some(value) => {
                let names = parse_list(value);
                if names.is_empty() {
                    return Err(ConfigError::InvalidAuth(
                        "AUTH_ALGORITHMS must list at least one algorithm".to_string(),
                    ));
                }
                names
                    .iter()
                    .map(|name| {
                        parse_asymmetric_algorithm(name).ok_or_else(|| {
                            ConfigError::InvalidAuth(format!(
                                "AUTH_ALGORITHMS entry '{name}' is not an asymmetric signature algorithm"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => vec![Algorithm::RS256],
        };

        let auth_excluded_paths = match vars.get("AUTH_EXCLUDED_PATHS") {
            Some(value) => parse_list(value),
            None => DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(ToString::to_string)
                .collect(),
        };
        if let Some(bad) = auth_excluded_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::InvalidAuth(format!(
                "AUTH_EXCLUDED_PATHS entry '{bad}' must start with '/'"
            )));
        }

        let auth_service_accounts = vars
            .get("AUTH_SERVICE_ACCOUNTS")
            .map(|v| parse_list(v))
            .unwrap_or_default();

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {value}"
                )));
            }

            let value = value.unsigned_abs();
            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {value}",
                    MAX_CLOCK_SKEW.as_secs()
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let jwks_cache_ttl = Duration::from_secs(positive_seconds(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
        )?);

        let jwks_fetch_timeout = Duration::from_secs(positive_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?);

        // Payment provider
        let payment_environment = match vars
            .get("PAYMENT_ENVIRONMENT")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("sandbox") => PaymentEnvironment::Sandbox,
            Some("production") => PaymentEnvironment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidPayment(format!(
                    "PAYMENT_ENVIRONMENT must be 'sandbox' or 'production', got '{other}'"
                )))
            }
        };

        let payment_api_url = vars
            .get("PAYMENT_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| payment_environment.base_url().to_string());

        let payment_merchant_id = required(vars, "PAYMENT_MERCHANT_ID")?;
        let payment_public_key = required(vars, "PAYMENT_PUBLIC_KEY")?;
        let payment_private_key = SecretString::from(required(vars, "PAYMENT_PRIVATE_KEY")?);

        let payment_request_timeout = Duration::from_secs(positive_seconds(
            vars,
            "PAYMENT_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_PAYMENT_REQUEST_TIMEOUT_SECONDS,
        )?);

        let drain_seconds = match vars.get("PAYMENTS_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDuration(format!(
                    "PAYMENTS_DRAIN_SECONDS must be a non-negative integer, got '{value_str}': {e}"
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            auth_issuer,
            auth_audiences,
            auth_jwks_url,
            auth_algorithms,
            auth_excluded_paths,
            auth_service_accounts,
            jwt_clock_skew,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            payment_environment,
            payment_api_url,
            payment_merchant_id,
            payment_public_key,
            payment_private_key,
            payment_request_timeout,
            drain_seconds,
        })
    }
}
