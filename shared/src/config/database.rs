//! MySQL connection settings for the relational token store

use serde::{Deserialize, Serialize};

use super::env_or;

/// Connection settings for the MySQL token store
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `mysql://` connection URL
    pub url: String,

    /// Upper bound of pooled connections
    pub max_connections: u32,

    /// Seconds to wait for a free connection before failing the request
    pub acquire_timeout: u64,

    /// Seconds an unused connection stays open
    pub idle_timeout: u64,

    /// Create `refresh_tokens` and `revoked_access_tokens` when missing
    pub ensure_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::from("mysql://localhost:3306/tokenward"),
            max_connections: 10,
            acquire_timeout: 5,
            idle_timeout: 600,
            ensure_schema: true,
        }
    }
}

impl DatabaseConfig {
    /// Read `DATABASE_*` variables over the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: env_or("DATABASE_URL", defaults.url),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            acquire_timeout: env_or("DATABASE_ACQUIRE_TIMEOUT", defaults.acquire_timeout),
            idle_timeout: env_or("DATABASE_IDLE_TIMEOUT", defaults.idle_timeout),
            ensure_schema: env_or("DATABASE_ENSURE_SCHEMA", defaults.ensure_schema),
        }
    }

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}
