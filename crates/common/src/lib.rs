//! Common utilities and types shared across the payments workspace.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (header decoding, claim timing checks, constants)
pub mod jwt;
