//! Payments Service Library
//!
//! An HTTP façade over a payment provider's merchant API (customers,
//! subscriptions, client tokens) guarded by bearer-token authentication.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> services/gateway.rs
//!                        |
//!                        v
//!                auth/jwt.rs (TokenVerifier) -> auth/jwks.rs (KeyResolver)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification and JWKS key resolution
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `models` - Request and response types
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Payment provider client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
