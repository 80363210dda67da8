//! Token signing and lifetime configuration

use serde::{Deserialize, Serialize};

use super::env_or;

/// JWT issuance configuration
///
/// Lifetimes are expressed in seconds. The signing secret is optional so that
/// RS256 deployments can leave it unset; an HS256 configuration without a
/// secret is rejected when the token service is constructed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Shared secret for HMAC signing
    pub secret: Option<String>,

    /// Algorithm for JWT signing (HS256, HS384, HS512, RS256, ...)
    pub algorithm: String,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// Tolerated clock drift in seconds
    pub clock_skew: i64,

    /// PEM private key used for RSA signing
    pub private_key_path: Option<String>,

    /// PEM public key used for RSA verification
    pub public_key_path: Option<String>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: default_algorithm(),
            issuer: String::from("tokenward"),
            audience: String::from("tokenward-api"),
            access_token_expiry: 900,      // 15 minutes
            refresh_token_expiry: 604800,  // 7 days
            clock_skew: 60,
            private_key_path: None,
            public_key_path: None,
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with an HMAC secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or(defaults.algorithm),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry),
            refresh_token_expiry: env_or("JWT_REFRESH_TOKEN_EXPIRY", defaults.refresh_token_expiry),
            clock_skew: env_or("JWT_CLOCK_SKEW", defaults.clock_skew),
            private_key_path: std::env::var("JWT_PRIVATE_KEY_PATH").ok(),
            public_key_path: std::env::var("JWT_PUBLIC_KEY_PATH").ok(),
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes.saturating_mul(60);
        self
    }

    /// Set refresh token expiry in minutes
    pub fn with_refresh_expiry_minutes(mut self, minutes: i64) -> Self {
        self.refresh_token_expiry = minutes.saturating_mul(60);
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days.saturating_mul(86_400);
        self
    }

    /// Set the clock skew tolerance in seconds
    pub fn with_clock_skew_seconds(mut self, seconds: i64) -> Self {
        self.clock_skew = seconds;
        self
    }

    /// Set issuer and audience
    pub fn with_issuer(mut self, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self.audience = audience.into();
        self
    }

    /// Whether the configuration selects an RSA algorithm
    pub fn uses_rsa(&self) -> bool {
        self.algorithm.to_ascii_uppercase().starts_with("RS")
    }
}

fn default_algorithm() -> String {
    String::from("HS256")
}
