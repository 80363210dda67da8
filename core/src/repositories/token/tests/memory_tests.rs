//! Unit tests for the in-memory token store

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::entities::token::{RefreshTokenRecord, RevocationEntry};
use crate::errors::DomainError;
use crate::repositories::token::{InMemoryTokenStore, TokenStore};

fn record(hash: &str, subject: &str, ttl: Duration) -> RefreshTokenRecord {
    let now = Utc::now();
    RefreshTokenRecord::new(hash.to_string(), subject, now, now + ttl)
}

#[tokio::test]
async fn test_put_and_take() {
    let store = InMemoryTokenStore::new();
    let saved = record("hash_a", "alice", Duration::days(7));

    store.put(saved.clone()).await.unwrap();
    assert_eq!(store.token_count().await, 1);

    let taken = store.take_and_remove("hash_a").await.unwrap();
    assert_eq!(taken, Some(saved));
    assert_eq!(store.token_count().await, 0);
}

#[tokio::test]
async fn test_take_is_single_use() {
    let store = InMemoryTokenStore::new();
    store.put(record("hash_a", "alice", Duration::days(7))).await.unwrap();

    assert!(store.take_and_remove("hash_a").await.unwrap().is_some());
    assert!(store.take_and_remove("hash_a").await.unwrap().is_none());
}

#[tokio::test]
async fn test_take_unknown_token() {
    let store = InMemoryTokenStore::new();
    assert!(store.take_and_remove("never_issued").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_put_conflicts() {
    let store = InMemoryTokenStore::new();
    store.put(record("same_hash", "alice", Duration::days(7))).await.unwrap();

    let result = store.put(record("same_hash", "bob", Duration::days(7))).await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));

    // The original record is untouched
    let taken = store.take_and_remove("same_hash").await.unwrap().unwrap();
    assert_eq!(taken.subject, "alice");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_take_has_single_winner() {
    let store = Arc::new(InMemoryTokenStore::new());
    store.put(record("contested", "alice", Duration::minutes(1))).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.take_and_remove("contested").await.unwrap() })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_purge_all_for_subject() {
    let store = InMemoryTokenStore::new();
    store.put(record("a1", "alice", Duration::days(7))).await.unwrap();
    store.put(record("a2", "alice", Duration::days(7))).await.unwrap();
    store.put(record("b1", "bob", Duration::days(7))).await.unwrap();

    assert_eq!(store.purge_all_for_subject("alice").await.unwrap(), 2);
    assert_eq!(store.purge_all_for_subject("alice").await.unwrap(), 0);

    assert!(store.take_and_remove("a1").await.unwrap().is_none());
    assert!(store.take_and_remove("a2").await.unwrap().is_none());
    assert!(store.take_and_remove("b1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_blacklist_is_idempotent() {
    let store = InMemoryTokenStore::new();
    let expires_at = Utc::now() + Duration::minutes(15);

    assert!(!store.is_blacklisted("jti-1").await.unwrap());

    store.blacklist(RevocationEntry::new("jti-1", expires_at)).await.unwrap();
    store.blacklist(RevocationEntry::new("jti-1", expires_at)).await.unwrap();

    assert!(store.is_blacklisted("jti-1").await.unwrap());
    assert!(!store.is_blacklisted("jti-2").await.unwrap());
    assert_eq!(store.blacklist_len().await, 1);
}

#[tokio::test]
async fn test_delete_expired_tokens() {
    let store = InMemoryTokenStore::new();
    let now = Utc::now();
    store
        .put(RefreshTokenRecord::new(
            "old",
            "alice",
            now - Duration::days(8),
            now - Duration::days(1),
        ))
        .await
        .unwrap();
    store.put(record("fresh", "alice", Duration::days(7))).await.unwrap();

    assert_eq!(store.delete_expired_tokens(now).await.unwrap(), 1);
    assert!(store.take_and_remove("old").await.unwrap().is_none());
    assert!(store.take_and_remove("fresh").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cleanup_blacklist() {
    let store = InMemoryTokenStore::new();
    let now = Utc::now();
    store
        .blacklist(RevocationEntry::new("stale", now - Duration::minutes(1)))
        .await
        .unwrap();
    store
        .blacklist(RevocationEntry::new("live", now + Duration::minutes(10)))
        .await
        .unwrap();

    assert_eq!(store.cleanup_blacklist(now).await.unwrap(), 1);
    assert!(!store.is_blacklisted("stale").await.unwrap());
    assert!(store.is_blacklisted("live").await.unwrap());
}

#[tokio::test]
async fn test_shared_through_arc_dyn() {
    let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    store.put(record("hash", "carol", Duration::hours(1))).await.unwrap();

    let taken = store.take_and_remove("hash").await.unwrap().unwrap();
    assert_eq!(taken.subject, "carol");
}
