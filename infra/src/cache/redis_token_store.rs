//! Redis implementation of the TokenStore trait
//!
//! Key layout, all under the configured prefix:
//!
//! - `refresh:<hash>` - JSON refresh record, expiring after the token plus the retention
//! - `subject:<subject>` - set of refresh hashes issued to a subject
//! - `revoked:<jti>` - blacklist entry, expiring with the access token
//!
//! Take-and-remove is a single `GETDEL`, so concurrent rotations of one
//! token are decided by the Redis server. Expiries on the index and
//! blacklist keys are only ever raised (`EXPIRE NX` then `EXPIRE GT`), so
//! racing writers keep the latest one. Expired entries are dropped by Redis
//! itself, which makes the sweep operations no-ops. Requires Redis 7.0.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use tw_core::domain::entities::token::{RefreshTokenRecord, RevocationEntry};
use tw_core::errors::DomainError;
use tw_core::repositories::TokenStore;

use super::{CacheConfig, RedisClient};
use crate::InfrastructureError;

/// Token store backed by Redis
#[derive(Clone)]
pub struct RedisTokenStore {
    client: RedisClient,
    retention: Duration,
}

impl RedisTokenStore {
    /// Create a store over an existing client
    ///
    /// # Arguments
    /// * `client` - Connected Redis client
    /// * `retention` - How long a refresh record outlives its expiry; must
    ///   cover the rotation clock skew
    pub fn new(client: RedisClient, retention: Duration) -> Self {
        Self { client, retention }
    }

    fn config(&self) -> &CacheConfig {
        self.client.config()
    }

    fn refresh_key(&self, token_hash: &str) -> String {
        refresh_key(self.config(), token_hash)
    }

    fn subject_key(&self, subject: &str) -> String {
        subject_key(self.config(), subject)
    }

    fn revoked_key(&self, jti: &str) -> String {
        revoked_key(self.config(), jti)
    }

    fn record_ttl(&self, record: &RefreshTokenRecord, now: DateTime<Utc>) -> u64 {
        let until = record
            .expires_at
            .checked_add_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        ttl_seconds(until, now)
    }
}

pub(crate) fn refresh_key(config: &CacheConfig, token_hash: &str) -> String {
    config.make_key(&format!("refresh:{}", token_hash))
}

pub(crate) fn subject_key(config: &CacheConfig, subject: &str) -> String {
    config.make_key(&format!("subject:{}", subject))
}

pub(crate) fn revoked_key(config: &CacheConfig, jti: &str) -> String {
    config.make_key(&format!("revoked:{}", jti))
}

/// Seconds from `now` until `until`, at least one
pub(crate) fn ttl_seconds(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    until.timestamp().saturating_sub(now.timestamp()).max(1) as u64
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let ttl = self.record_ttl(&record, Utc::now());
        let payload = serde_json::to_string(&record).map_err(InfrastructureError::from)?;

        let written = self
            .client
            .set_nx_with_expiry(&self.refresh_key(&record.token_hash), &payload, ttl)
            .await?;
        if !written {
            return Err(DomainError::Conflict {
                message: "Refresh token already exists".to_string(),
            });
        }

        // The index lives as long as the longest-lived token it references
        let subject_key = self.subject_key(&record.subject);
        self.client.set_add(&subject_key, &record.token_hash).await?;
        self.client.extend_expiry(&subject_key, ttl).await?;

        debug!(subject = %record.subject, ttl, "Stored refresh token record");
        Ok(())
    }

    async fn take_and_remove(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let payload = match self.client.get_del(&self.refresh_key(token_hash)).await? {
            Some(payload) => payload,
            None => return Ok(None),
        };

        let record: RefreshTokenRecord =
            serde_json::from_str(&payload).map_err(InfrastructureError::from)?;

        // The record is already gone; a stale index entry only costs a no-op delete on purge
        let subject_key = self.subject_key(&record.subject);
        if let Err(e) = self.client.set_remove(&subject_key, token_hash).await {
            warn!(subject = %record.subject, error = %e, "Failed to update subject index");
        }

        Ok(Some(record))
    }

    async fn purge_all_for_subject(&self, subject: &str) -> Result<usize, DomainError> {
        let subject_key = self.subject_key(subject);
        let hashes = self.client.set_members(&subject_key).await?;

        let keys: Vec<String> = hashes.iter().map(|hash| self.refresh_key(hash)).collect();
        let removed = self.client.delete_many(&keys).await?;
        self.client.delete_many(&[subject_key]).await?;

        info!(subject, removed, "Purged refresh tokens from Redis");
        Ok(removed as usize)
    }

    async fn blacklist(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        let key = self.revoked_key(&entry.jti);
        let ttl = ttl_seconds(entry.expires_at, Utc::now());

        // An existing entry keeps whichever expiry is later
        self.client.set_nx_with_expiry(&key, "1", ttl).await?;
        self.client.extend_expiry(&key, ttl).await?;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError> {
        Ok(self.client.exists(&self.revoked_key(jti)).await?)
    }

    async fn delete_expired_tokens(&self, _now: DateTime<Utc>) -> Result<usize, DomainError> {
        debug!("Refresh records expire through Redis TTL, nothing to sweep");
        Ok(0)
    }

    async fn cleanup_blacklist(&self, _now: DateTime<Utc>) -> Result<usize, DomainError> {
        debug!("Blacklist entries expire through Redis TTL, nothing to sweep");
        Ok(0)
    }
}
