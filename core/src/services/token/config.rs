//! Configuration for the token service

use chrono::Duration;
use tw_shared::config::JwtConfig;

use crate::errors::DomainError;

use super::key_manager::SigningCredential;

/// Configuration for the token service
///
/// Constructed once at startup and handed to [`super::TokenService`].
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// `iss` claim written into and required from access tokens
    pub issuer: String,
    /// `aud` claim written into and required from access tokens
    pub audience: String,
    /// Signing credential; `None` is a fatal misconfiguration
    pub credential: Option<SigningCredential>,
    /// Default access token lifetime
    pub access_token_expiry: Duration,
    /// Default refresh token lifetime
    pub refresh_token_expiry: Duration,
    /// Clock skew tolerance used by the rotation window
    pub clock_skew: Duration,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        let jwt = JwtConfig::default();
        Self {
            issuer: jwt.issuer,
            audience: jwt.audience,
            credential: None,
            access_token_expiry: Duration::minutes(15),
            refresh_token_expiry: Duration::days(7),
            clock_skew: Duration::minutes(1),
        }
    }
}

impl TokenServiceConfig {
    /// Default configuration signing with `credential`
    pub fn new(credential: SigningCredential) -> Self {
        Self {
            credential: Some(credential),
            ..Default::default()
        }
    }

    /// Build from the shared JWT configuration, loading key material
    ///
    /// Second counts too large for a [`Duration`] are a configuration error.
    pub fn from_jwt_config(config: &JwtConfig) -> Result<Self, DomainError> {
        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            credential: SigningCredential::from_jwt_config(config)?,
            access_token_expiry: seconds("access_token_expiry", config.access_token_expiry)?,
            refresh_token_expiry: seconds("refresh_token_expiry", config.refresh_token_expiry)?,
            clock_skew: seconds("clock_skew", config.clock_skew)?,
        })
    }

    /// Set the default lifetimes
    pub fn with_lifetimes(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_expiry = access;
        self.refresh_token_expiry = refresh;
        self
    }

    /// Set the clock skew tolerance
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Set issuer and audience
    pub fn with_issuer(mut self, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self.audience = audience.into();
        self
    }

    /// Check the values that cannot be corrected per request
    pub(crate) fn validate(&self) -> Result<(), DomainError> {
        if self.issuer.is_empty() || self.audience.is_empty() {
            return Err(DomainError::Configuration {
                message: "Issuer and audience must be configured".to_string(),
            });
        }
        if self.access_token_expiry <= Duration::zero()
            || self.refresh_token_expiry <= Duration::zero()
        {
            return Err(DomainError::Configuration {
                message: "Token lifetimes must be positive".to_string(),
            });
        }
        if self.clock_skew < Duration::zero() {
            return Err(DomainError::Configuration {
                message: "Clock skew must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

fn seconds(name: &str, value: i64) -> Result<Duration, DomainError> {
    Duration::try_seconds(value).ok_or_else(|| DomainError::Configuration {
        message: format!("{} of {}s is out of range", name, value),
    })
}

impl TryFrom<&JwtConfig> for TokenServiceConfig {
    type Error = DomainError;

    fn try_from(config: &JwtConfig) -> Result<Self, Self::Error> {
        Self::from_jwt_config(config)
    }
}
