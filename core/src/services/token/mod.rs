//! Token service module
//!
//! This module handles all token-related operations including:
//! - Access token signing and verification
//! - Refresh token issuance and single-use rotation
//! - Access token revocation and subject-wide purges
//! - Signing credential loading (HMAC secrets, RSA PEM keys)
//! - On-demand cleanup of expired records

mod cleanup;
mod config;
mod key_manager;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, TokenCleanupConfig, TokenCleanupService};
pub use config::TokenServiceConfig;
pub use key_manager::SigningCredential;
pub use service::TokenService;
