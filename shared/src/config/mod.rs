//! Configuration module
//!
//! This module organizes configuration into logical areas:
//! - `auth` - Token signing, issuer/audience and lifetimes
//! - `cache` - Redis configuration for the Redis token store
//! - `database` - MySQL configuration for the relational token store
//! - `environment` - Deployment environment detection
//! - `logging` - Log filter and output format
//! - `store` - Selection of the token store backend

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;
pub mod logging;
pub mod store;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use auth::JwtConfig;
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::Environment;
pub use logging::{LogFormat, LoggingConfig};
pub use store::{StoreBackend, StoreConfig};

/// Prefix for environment overrides consumed by [`AppConfig::load`]
pub const ENV_PREFIX: &str = "TOKENWARD";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Token issuance configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Token store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl AppConfig {
    /// Defaults for the given environment
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            jwt: JwtConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load configuration from plain environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            jwt: JwtConfig::from_env(),
            store: StoreConfig::from_env(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load layered configuration
    ///
    /// Environment defaults, then the optional `config.<environment>.toml`
    /// file, then `TOKENWARD__SECTION__KEY` environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let environment = Environment::from_env();
        Self::load_from(environment, &environment.config_file())
    }

    /// Load layered configuration using an explicit file path
    pub fn load_from(environment: Environment, path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Self::for_environment(environment))?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

/// Parse `key` from the environment, keeping `default` when unset or malformed
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_environment() {
        let config = AppConfig::for_environment(Environment::Production);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_load_without_file_yields_defaults() {
        let config = AppConfig::load_from(
            Environment::Staging,
            "does-not-exist/config.staging.toml",
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.jwt.issuer, "tokenward");
        assert_eq!(config.jwt.clock_skew, 60);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_or_keeps_default_for_malformed_values() {
        std::env::set_var("TOKENWARD_TEST_ENV_OR_NUMBER", "not-a-number");
        assert_eq!(env_or("TOKENWARD_TEST_ENV_OR_NUMBER", 7u32), 7);

        std::env::set_var("TOKENWARD_TEST_ENV_OR_NUMBER", "42");
        assert_eq!(env_or("TOKENWARD_TEST_ENV_OR_NUMBER", 7u32), 42);

        assert_eq!(env_or("TOKENWARD_TEST_ENV_OR_UNSET", String::from("x")), "x");
    }

    #[test]
    fn test_deserialize_toml_style_document() {
        let json = r#"{
            "environment": "production",
            "jwt": { "issuer": "auth.example", "clock_skew": 30 },
            "store": { "backend": "redis", "cache": { "url": "redis://cache:6379" } }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.jwt.issuer, "auth.example");
        assert_eq!(config.jwt.clock_skew, 30);
        assert_eq!(config.jwt.access_token_expiry, 900);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.cache.url, "redis://cache:6379");
    }
}
