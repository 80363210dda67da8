//! # Infrastructure Layer
//!
//! Persistent implementations of the [`tw_core::TokenStore`] contract.
//!
//! ## Features
//!
//! - `mysql`: MySQL token store using SQLx (default)
//! - `redis-cache`: Redis token store (default)
//!
//! The in-memory store lives in `tw_core`; [`build_store`] picks one of the
//! three according to [`tw_shared::StoreConfig`].

use tw_core::DomainError;

/// Cache module - Redis client and token store
#[cfg(feature = "redis-cache")]
pub mod cache;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Store selection at startup
pub mod factory;

pub use factory::build_store;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[cfg(feature = "mysql")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[cfg(feature = "redis-cache")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Stored record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Config(message) => DomainError::Configuration { message },
            other => DomainError::Storage {
                message: other.to_string(),
            },
        }
    }
}
