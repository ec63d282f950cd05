//! Authentication module for the payments service.
//!
//! This module handles bearer-token validation against the identity
//! provider's JWKS endpoint.
//!
//! # Components
//!
//! - `error` - Failure taxonomy and its HTTP mapping
//! - `jwks` - Key resolver fetching and caching public keys
//! - `jwt` - Token verification pipeline
//! - `claims` - Verified claims and claim validation

pub mod claims;
pub mod error;
pub mod jwks;
pub mod jwt;

pub use claims::{Audience, ClaimRules, TokenClaims};
pub use error::{AuthError, ClaimKind};
pub use jwks::{KeyResolver, KeySet, SigningKey};
pub use jwt::{extract_bearer, AuthDecision, TokenVerifier};
