//! Token store trait defining refresh-token and revocation persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::token::{RefreshTokenRecord, RevocationEntry};
use crate::errors::DomainError;

/// Persistence contract for refresh tokens and the access-token blacklist
///
/// The store is the single source of truth for refresh-token validity. Every
/// operation is a single-key operation; only [`take_and_remove`] needs true
/// atomicity, since it is what makes refresh tokens single-use.
///
/// # Security Considerations
/// - Records are keyed by the SHA-256 digest of the bearer value
/// - A consumed or purged record is gone, there are no tombstones
/// - Errors are infrastructure failures and must be propagated
///
/// [`take_and_remove`]: TokenStore::take_and_remove
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a new refresh token record
    ///
    /// # Returns
    /// * `Ok(())` - Record persisted
    /// * `Err(DomainError::Conflict)` - A record with the same hash exists
    /// * `Err(DomainError::Storage)` - Storage layer failure
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::{Duration, Utc};
    /// # use tw_core::domain::RefreshTokenRecord;
    /// # use tw_core::repositories::TokenStore;
    /// # async fn example(store: &impl TokenStore) -> Result<(), Box<dyn std::error::Error>> {
    /// let now = Utc::now();
    /// let record = RefreshTokenRecord::new(
    ///     "sha256_hex_digest".to_string(),
    ///     "alice",
    ///     now,
    ///     now + Duration::days(7),
    /// );
    /// store.put(record).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), DomainError>;

    /// Atomically find and delete the record for `token_hash`
    ///
    /// Concurrent callers presenting the same hash: exactly one observes
    /// `Some`, every other caller observes `None`.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - The record existed and has been removed
    /// * `Ok(None)` - Never issued, already consumed or purged
    /// * `Err(DomainError)` - Storage layer failure
    async fn take_and_remove(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError>;

    /// Remove every refresh token record belonging to `subject`
    ///
    /// Idempotent. Returns the number of records removed.
    async fn purge_all_for_subject(&self, subject: &str) -> Result<usize, DomainError>;

    /// Add an access token id to the revocation set
    ///
    /// Idempotent; blacklisting an id twice is a no-op.
    async fn blacklist(&self, entry: RevocationEntry) -> Result<(), DomainError>;

    /// Check whether an access token id has been revoked
    ///
    /// Must observe every `blacklist` call that completed before it on the
    /// same store instance.
    async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError>;

    /// Delete refresh token records that expired before `now`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records deleted
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Delete revocation entries whose access token expired before `now`
    ///
    /// Backends with native expiry may return `Ok(0)`.
    async fn cleanup_blacklist(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        (**self).put(record).await
    }

    async fn take_and_remove(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError> {
        (**self).take_and_remove(token_hash).await
    }

    async fn purge_all_for_subject(&self, subject: &str) -> Result<usize, DomainError> {
        (**self).purge_all_for_subject(subject).await
    }

    async fn blacklist(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        (**self).blacklist(entry).await
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError> {
        (**self).is_blacklisted(jti).await
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        (**self).delete_expired_tokens(now).await
    }

    async fn cleanup_blacklist(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        (**self).cleanup_blacklist(now).await
    }
}
