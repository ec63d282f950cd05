//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types
//! for merchant private keys, bearer tokens handed to test clients, and any
//! other credential that must never reach a log line.
//!
//! `SecretString` implements `Debug` with redaction, so a struct deriving
//! `Debug` around it is safe to log. Reading the value requires an explicit
//! `expose_secret()` call.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct MerchantCredentials {
//!     public_key: String,
//!     private_key: SecretString,
//! }
//!
//! let creds = MerchantCredentials {
//!     public_key: "pk_live".to_string(),
//!     private_key: SecretString::from("sk_live"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("sk_live"));
//! assert_eq!(creds.private_key.expose_secret(), "sk_live");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("merchant-private-key");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("merchant-private-key"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("private-key-123");
        assert_eq!(secret.expose_secret(), "private-key-123");
    }

    #[test]
    fn test_deserialize_keeps_value_out_of_debug() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Credentials {
            merchant_id: String,
            private_key: SecretString,
        }

        let json = r#"{"merchant_id": "m-1", "private_key": "my-secret-value"}"#;
        let creds: Credentials = serde_json::from_str(json).expect("deserialize");

        assert_eq!(creds.private_key.expose_secret(), "my-secret-value");

        let debug = format!("{creds:?}");
        assert!(debug.contains("m-1"));
        assert!(!debug.contains("my-secret-value"));
    }
}
