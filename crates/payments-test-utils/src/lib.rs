//! Test utilities for the payments service
//!
//! This crate provides reusable test utilities including:
//! - Signing keypairs and JWKS documents for every accepted algorithm
//! - Builders for bearer-token claims
//! - A mock identity-provider JWKS endpoint
//! - A server harness for E2E tests over real HTTP

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
