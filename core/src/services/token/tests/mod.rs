
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::clock::ManualClock;
use crate::domain::entities::token::{RefreshTokenRecord, RevocationEntry};
use crate::errors::DomainError;
use crate::repositories::{InMemoryTokenStore, TokenStore};
use crate::services::token::{SigningCredential, TokenService, TokenServiceConfig};

pub(super) const TEST_SECRET: &str = "test-secret-not-for-production";

pub(super) fn test_config() -> TokenServiceConfig {
    TokenServiceConfig::new(SigningCredential::hs256(TEST_SECRET).unwrap())
        .with_lifetimes(Duration::minutes(15), Duration::minutes(10))
        .with_clock_skew(Duration::minutes(1))
}

pub(super) fn create_test_service() -> (TokenService<InMemoryTokenStore>, ManualClock) {
    create_service_with_store(InMemoryTokenStore::new())
}

pub(super) fn create_service_with_store<S: TokenStore>(
    store: S,
) -> (TokenService<S>, ManualClock) {
    let clock = ManualClock::starting_now();
    let service = TokenService::with_clock(store, test_config(), Arc::new(clock.clone()))
        .expect("Failed to create token service");
    (service, clock)
}

/// Store whose operations fail with a storage error
#[derive(Default)]
pub(super) struct FailingTokenStore;

#[async_trait]
impl TokenStore for FailingTokenStore {
    async fn put(&self, _record: RefreshTokenRecord) -> Result<(), DomainError> {
        Err(DomainError::storage("write failed"))
    }

    async fn take_and_remove(
        &self,
        _token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError> {
        Err(DomainError::storage("read failed"))
    }

    async fn purge_all_for_subject(&self, _subject: &str) -> Result<usize, DomainError> {
        Err(DomainError::storage("write failed"))
    }

    async fn blacklist(&self, _entry: RevocationEntry) -> Result<(), DomainError> {
        Err(DomainError::storage("write failed"))
    }

    async fn is_blacklisted(&self, _jti: &str) -> Result<bool, DomainError> {
        Err(DomainError::storage("read failed"))
    }

    async fn delete_expired_tokens(&self, _now: DateTime<Utc>) -> Result<usize, DomainError> {
        Err(DomainError::storage("write failed"))
    }

    async fn cleanup_blacklist(&self, _now: DateTime<Utc>) -> Result<usize, DomainError> {
        Err(DomainError::storage("write failed"))
    }
}

/// In-memory store reporting a collision for the first `collisions` puts
pub(super) struct CollidingTokenStore {
    inner: InMemoryTokenStore,
    collisions: usize,
    puts: AtomicUsize,
}

impl CollidingTokenStore {
    pub(super) fn new(collisions: usize) -> Self {
        Self {
            inner: InMemoryTokenStore::new(),
            collisions,
            puts: AtomicUsize::new(0),
        }
    }

    pub(super) fn put_attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for CollidingTokenStore {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let attempt = self.puts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.collisions {
            return Err(DomainError::Conflict {
                message: "Refresh token already exists".to_string(),
            });
        }
        self.inner.put(record).await
    }

    async fn take_and_remove(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError> {
        self.inner.take_and_remove(token_hash).await
    }

    async fn purge_all_for_subject(&self, subject: &str) -> Result<usize, DomainError> {
        self.inner.purge_all_for_subject(subject).await
    }

    async fn blacklist(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        self.inner.blacklist(entry).await
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError> {
        self.inner.is_blacklisted(jti).await
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.inner.delete_expired_tokens(now).await
    }

    async fn cleanup_blacklist(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.inner.cleanup_blacklist(now).await
    }
}
