//! Middleware for the payments service.
//!
//! # Components
//!
//! - `auth` - Bearer-token authentication for every non-allow-listed path
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
