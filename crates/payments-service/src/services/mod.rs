//! Service layer for the payments service.
//!
//! # Components
//!
//! - `gateway` - Payment provider client and its in-memory mock

pub mod gateway;

pub use gateway::{GatewayError, HttpPaymentGateway, PaymentGateway};
