//! Redis client with retry logic
//!
//! Holds one multiplexed connection shared by all clones. Commands whose
//! effect does not change when delivered twice are retried with exponential
//! backoff on transient errors. Consuming commands (`GETDEL`, `SET NX`,
//! `DEL`) are sent exactly once: a reply lost after the server applied them
//! cannot be told apart from a miss, so the failure is returned as is.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::CacheConfig;
use crate::InfrastructureError;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Characters of a key's last segment kept in log output
const KEY_FINGERPRINT_LEN: usize = 12;

/// Whether a command may be sent again after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Replay {
    /// Sending twice leaves the same state and reply as sending once
    Safe,
    /// The first delivery may have been applied even though its reply was lost
    Forbidden,
}

/// Redis client with connection reuse and retry logic
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
}

impl RedisClient {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Example
    /// ```no_run
    /// use tw_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379").with_prefix("auth");
    ///     let client = RedisClient::new(config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!("Creating Redis client with URL: {}", mask_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::connect(client, &config).await?;
        info!("Redis client created successfully");

        Ok(Self { connection, config })
    }

    async fn connect(
        client: Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = config.retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => return Ok(connection),
                Err(e) if attempts < config.max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, config.max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Configuration this client was created with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Set a value with expiration time, only if the key does not exist
    ///
    /// Sent once; a transport failure is an error even if the server may
    /// have written the key.
    ///
    /// # Returns
    /// * `Ok(true)` - The key was written
    /// * `Ok(false)` - The key already existed and was left untouched
    pub async fn set_nx_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<bool, InfrastructureError> {
        self.execute(Replay::Forbidden, |mut conn| {
            let key = key.to_string();
            let value = value.to_string();

            Box::pin(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(expiry_seconds)
                    .query_async::<_, Option<String>>(&mut conn)
                    .await
            })
        })
        .await
        .map(|reply| reply.is_some())
        .map_err(|e| {
            error!("Failed to set key '{}': {}", key_fingerprint(key), e);
            InfrastructureError::Cache(e)
        })
    }

    /// Atomically read and delete a key
    ///
    /// Requires Redis 6.2 or later. Sent once, so `Ok(None)` always means
    /// the key was absent.
    pub async fn get_del(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        self.execute(Replay::Forbidden, |mut conn| {
            let key = key.to_string();

            Box::pin(async move {
                redis::cmd("GETDEL")
                    .arg(key)
                    .query_async::<_, Option<String>>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(|e| {
            error!("Failed to take key '{}': {}", key_fingerprint(key), e);
            InfrastructureError::Cache(e)
        })
    }

    /// Delete keys, returning how many existed
    pub async fn delete_many(&self, keys: &[String]) -> Result<u64, InfrastructureError> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.execute(Replay::Forbidden, |mut conn| {
            let keys = keys.to_vec();

            Box::pin(async move { conn.del::<_, u64>(keys).await })
        })
        .await
        .map_err(|e| {
            error!("Failed to delete {} keys: {}", keys.len(), e);
            InfrastructureError::Cache(e)
        })
    }

    /// Check if a key exists in cache
    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        self.execute(Replay::Safe, |mut conn| {
            let key = key.to_string();

            Box::pin(async move { conn.exists::<_, bool>(key).await })
        })
        .await
        .map_err(|e| {
            error!("Failed to check key '{}': {}", key_fingerprint(key), e);
            InfrastructureError::Cache(e)
        })
    }

    /// Remaining time-to-live of a key in seconds
    ///
    /// `None` if the key does not exist or has no expiry.
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, InfrastructureError> {
        let result = self
            .execute(Replay::Safe, |mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.ttl::<_, i64>(key).await })
            })
            .await;

        match result {
            Ok(ttl) if ttl >= 0 => Ok(Some(ttl)),
            Ok(_) => Ok(None),
            Err(e) => {
                error!("Failed to get TTL for key '{}': {}", key_fingerprint(key), e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Raise the expiry of a key to at least `expiry_seconds`
    ///
    /// `EXPIRE NX` gives a key without expiry its first TTL and `EXPIRE GT`
    /// only ever lengthens it, so concurrent callers converge on the largest
    /// value. Requires Redis 7.0 or later.
    pub async fn extend_expiry(
        &self,
        key: &str,
        expiry_seconds: u64,
    ) -> Result<(), InfrastructureError> {
        for condition in ["NX", "GT"] {
            self.execute(Replay::Safe, |mut conn| {
                let key = key.to_string();

                Box::pin(async move {
                    redis::cmd("EXPIRE")
                        .arg(key)
                        .arg(expiry_seconds)
                        .arg(condition)
                        .query_async::<_, i64>(&mut conn)
                        .await
                })
            })
            .await
            .map_err(|e| {
                error!("Failed to extend expiry of key '{}': {}", key_fingerprint(key), e);
                InfrastructureError::Cache(e)
            })?;
        }
        Ok(())
    }

    /// Add a member to a set
    pub async fn set_add(&self, key: &str, member: &str) -> Result<(), InfrastructureError> {
        self.execute(Replay::Safe, |mut conn| {
            let key = key.to_string();
            let member = member.to_string();

            Box::pin(async move { conn.sadd::<_, _, ()>(key, member).await })
        })
        .await
        .map_err(|e| {
            error!("Failed to add to set '{}': {}", key_fingerprint(key), e);
            InfrastructureError::Cache(e)
        })
    }

    /// Remove a member from a set
    pub async fn set_remove(&self, key: &str, member: &str) -> Result<(), InfrastructureError> {
        self.execute(Replay::Safe, |mut conn| {
            let key = key.to_string();
            let member = member.to_string();

            Box::pin(async move { conn.srem::<_, _, ()>(key, member).await })
        })
        .await
        .map_err(|e| {
            error!("Failed to remove from set '{}': {}", key_fingerprint(key), e);
            InfrastructureError::Cache(e)
        })
    }

    /// All members of a set
    pub async fn set_members(&self, key: &str) -> Result<Vec<String>, InfrastructureError> {
        self.execute(Replay::Safe, |mut conn| {
            let key = key.to_string();

            Box::pin(async move { conn.smembers::<_, Vec<String>>(key).await })
        })
        .await
        .map_err(|e| {
            error!("Failed to read set '{}': {}", key_fingerprint(key), e);
            InfrastructureError::Cache(e)
        })
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let result = self
            .execute(Replay::Safe, |mut conn| {
                Box::pin(async move {
                    redis::cmd("PING")
                        .query_async::<_, String>(&mut conn)
                        .await
                })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => Ok(true),
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Execute a Redis operation, retrying it when `replay` allows
    async fn execute<F, T>(&self, replay: Replay, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match operation(conn).await {
                Ok(result) => return Ok(result),
                Err(e) if should_retry(replay, &e, attempts, self.config.max_retries) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, self.config.max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn next_delay(delay: u64) -> u64 {
    delay.saturating_mul(2).min(5000)
}

/// Whether a failed attempt may be sent again
pub(crate) fn should_retry(
    replay: Replay,
    error: &RedisError,
    attempts: u32,
    max_retries: u32,
) -> bool {
    replay == Replay::Safe && attempts < max_retries && is_retriable_error(error)
}

/// Whether a Redis error is transient
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError | redis::ErrorKind::BusyLoadingError | redis::ErrorKind::TryAgain
    )
}

/// Loggable form of a key: its namespace plus a prefix of the last segment
///
/// Refresh keys end in the token digest, which must not appear in logs.
pub(crate) fn key_fingerprint(key: &str) -> String {
    let (namespace, id) = match key.rfind(':') {
        Some(pos) => key.split_at(pos + 1),
        None => ("", key),
    };
    let shown: String = id.chars().take(KEY_FINGERPRINT_LEN).collect();
    format!("{}{}", namespace, shown)
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
