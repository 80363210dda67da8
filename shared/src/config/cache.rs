//! Redis connection settings for the Redis token store

use serde::{Deserialize, Serialize};

use super::env_or;

/// Connection and key layout settings for the Redis token store
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `redis://` connection URL
    pub url: String,

    /// Namespace prepended to every key, empty for none
    pub key_prefix: String,

    /// Attempts per resendable command, the first one included
    pub max_retries: u32,

    /// Initial backoff in milliseconds, doubled after each failed attempt
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            key_prefix: String::from("tokenward"),
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl CacheConfig {
    /// Read `REDIS_*` variables over the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: env_or("REDIS_URL", defaults.url),
            key_prefix: env_or("REDIS_KEY_PREFIX", defaults.key_prefix),
            max_retries: env_or("REDIS_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("REDIS_RETRY_DELAY_MS", defaults.retry_delay_ms),
        }
    }

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// `<prefix>:<key>`, or `key` alone when no prefix is configured
    pub fn make_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}
