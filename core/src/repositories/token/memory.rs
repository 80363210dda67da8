//! In-memory implementation of TokenStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::token::{RefreshTokenRecord, RevocationEntry};
use crate::errors::DomainError;

use super::r#trait::TokenStore;

/// Process-local token store
///
/// Take-and-remove runs under the refresh map's write lock, which makes it
/// indivisible for all tasks sharing this instance. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, RefreshTokenRecord>>>,
    revoked: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl InMemoryTokenStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh token records currently held
    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Number of revocation entries currently held
    pub async fn blacklist_len(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let mut tokens = self.tokens.write().await;

        if tokens.contains_key(&record.token_hash) {
            return Err(DomainError::Conflict {
                message: "Refresh token already exists".to_string(),
            });
        }

        tokens.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn take_and_remove(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let mut tokens = self.tokens.write().await;
        Ok(tokens.remove(token_hash))
    }

    async fn purge_all_for_subject(&self, subject: &str) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let initial_count = tokens.len();

        tokens.retain(|_, record| record.subject != subject);

        Ok(initial_count - tokens.len())
    }

    async fn blacklist(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        let mut revoked = self.revoked.write().await;
        let expires_at = revoked.entry(entry.jti).or_insert(entry.expires_at);
        // Keep the later expiry if the same id is revoked twice
        if entry.expires_at > *expires_at {
            *expires_at = entry.expires_at;
        }
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError> {
        let revoked = self.revoked.read().await;
        Ok(revoked.contains_key(jti))
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let initial_count = tokens.len();

        tokens.retain(|_, record| !record.is_expired_at(now));

        Ok(initial_count - tokens.len())
    }

    async fn cleanup_blacklist(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut revoked = self.revoked.write().await;
        let initial_count = revoked.len();

        revoked.retain(|_, expires_at| now < *expires_at);

        Ok(initial_count - revoked.len())
    }
}
