//! Observability module for the payments service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
