//! Token store selection
//!
//! The backend is chosen once at startup from [`StoreConfig`] and handed to
//! the services as a shared trait object.

use std::sync::Arc;

use tracing::info;
use tw_core::{InMemoryTokenStore, TokenStore};
use tw_shared::config::{StoreBackend, StoreConfig};

use crate::InfrastructureError;

/// Build the configured token store
///
/// # Returns
/// * `Ok(store)` - Connected store ready for use
/// * `Err(InfrastructureError::Config)` - Backend not compiled in or invalid settings
/// * `Err(InfrastructureError)` - Backend unreachable
pub async fn build_store(
    config: &StoreConfig,
) -> Result<Arc<dyn TokenStore>, InfrastructureError> {
    info!(backend = %config.backend, "Building token store");

    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryTokenStore::new())),
        StoreBackend::Redis => build_redis_store(config).await,
        StoreBackend::Mysql => build_mysql_store(config).await,
    }
}

#[cfg(feature = "redis-cache")]
async fn build_redis_store(
    config: &StoreConfig,
) -> Result<Arc<dyn TokenStore>, InfrastructureError> {
    use crate::cache::{RedisClient, RedisTokenStore};

    let retention = retention(config)?;
    let client = RedisClient::new(config.cache.clone()).await?;
    Ok(Arc::new(RedisTokenStore::new(client, retention)))
}

#[cfg(not(feature = "redis-cache"))]
async fn build_redis_store(
    _config: &StoreConfig,
) -> Result<Arc<dyn TokenStore>, InfrastructureError> {
    Err(InfrastructureError::Config(
        "Redis store requested but the redis-cache feature is disabled".to_string(),
    ))
}

#[cfg(feature = "mysql")]
async fn build_mysql_store(
    config: &StoreConfig,
) -> Result<Arc<dyn TokenStore>, InfrastructureError> {
    use crate::database::{DatabasePool, MySqlTokenStore};

    let pool = DatabasePool::new(&config.database).await?;
    let store = MySqlTokenStore::new(pool.get_pool().clone());
    if config.database.ensure_schema {
        store.ensure_schema().await?;
    }
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mysql"))]
async fn build_mysql_store(
    _config: &StoreConfig,
) -> Result<Arc<dyn TokenStore>, InfrastructureError> {
    Err(InfrastructureError::Config(
        "MySQL store requested but the mysql feature is disabled".to_string(),
    ))
}

#[cfg(feature = "redis-cache")]
fn retention(config: &StoreConfig) -> Result<chrono::Duration, InfrastructureError> {
    i64::try_from(config.retention)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| {
            InfrastructureError::Config(format!("Retention out of range: {}", config.retention))
        })
}
