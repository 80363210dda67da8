//! Shared configuration and bootstrap utilities for Tokenward
//!
//! This crate provides common functionality used across all workspace members:
//! - Configuration types (token lifetimes, store selection, environment)
//! - Logging bootstrap

pub mod config;
pub mod logging;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, DatabaseConfig, Environment, JwtConfig, LogFormat, LoggingConfig,
    StoreBackend, StoreConfig,
};
pub use logging::init_tracing;
