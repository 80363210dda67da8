//! Token store backend selection

use serde::{Deserialize, Serialize};

use super::cache::CacheConfig;
use super::database::DatabaseConfig;
use super::env_or;

/// Persistence backend holding refresh tokens and the revocation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps; state is lost on restart
    #[default]
    Memory,
    /// Redis with native key expiry
    Redis,
    /// MySQL tables
    Mysql,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            "mysql" | "database" => Ok(StoreBackend::Mysql),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Redis => write!(f, "redis"),
            StoreBackend::Mysql => write!(f, "mysql"),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Selected backend
    pub backend: StoreBackend,

    /// Redis settings, used when `backend` is `redis`
    pub cache: CacheConfig,

    /// MySQL settings, used when `backend` is `mysql`
    pub database: DatabaseConfig,

    /// Seconds a refresh record outlives its expiry in TTL-managed backends
    ///
    /// Must cover the rotation clock skew.
    pub retention: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            cache: CacheConfig::default(),
            database: DatabaseConfig::default(),
            retention: 300,
        }
    }
}

impl StoreConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            backend: env_or("TOKEN_STORE", defaults.backend),
            cache: CacheConfig::from_env(),
            database: DatabaseConfig::from_env(),
            retention: env_or("TOKEN_STORE_RETENTION", defaults.retention),
        }
    }

    /// In-memory store configuration
    pub fn memory() -> Self {
        Self::default()
    }
}
