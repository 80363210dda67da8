//! End-to-end token lifecycle through the public API
//!
//! Each test drives a [`TokenService`] over the in-memory store with a
//! manually advanced clock.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Duration;
use tw_core::{
    InMemoryTokenStore, ManualClock, RejectReason, RotationOutcome, SigningCredential, TokenService,
    TokenServiceConfig, TokenStore,
};

fn alice_config() -> TokenServiceConfig {
    TokenServiceConfig::new(SigningCredential::hs256("lifecycle-test-secret").unwrap())
        .with_lifetimes(Duration::minutes(15), Duration::minutes(10))
        .with_clock_skew(Duration::minutes(1))
}

fn service() -> (TokenService<InMemoryTokenStore>, ManualClock) {
    let clock = ManualClock::starting_now();
    let service =
        TokenService::with_clock(InMemoryTokenStore::new(), alice_config(), Arc::new(clock.clone()))
            .unwrap();
    (service, clock)
}

#[tokio::test]
async fn test_alice_session_scenario() {
    let (service, clock) = service();

    // Rotating right after issuance is refused and ends the session
    let token = service.issue_refresh_token("alice", None).await.unwrap();
    let outcome = service.rotate_refresh_token(&token).await.unwrap();
    assert_eq!(outcome, RotationOutcome::Rejected(RejectReason::TooFresh));

    let outcome = service.rotate_refresh_token(&token).await.unwrap();
    assert_eq!(outcome, RotationOutcome::Rejected(RejectReason::Unknown));

    // A new token presented 9.5 minutes into its 10 minute life rotates
    let token = service.issue_refresh_token("alice", None).await.unwrap();
    clock.advance(Duration::seconds(570));

    match service.rotate_refresh_token(&token).await.unwrap() {
        RotationOutcome::Accepted { subject, refresh_token } => {
            assert_eq!(subject, "alice");
            assert!(!refresh_token.is_empty());
            assert_ne!(refresh_token, token);
        }
        other => panic!("expected rotation to succeed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_access_token_round_trip_for_many_role_sets() {
    let (service, _clock) = service();
    let role_sets: Vec<Vec<&str>> = vec![
        vec![],
        vec!["user"],
        vec!["admin", "user"],
        vec!["user", "admin"],
        vec!["auditor", "auditor", "billing", "support"],
    ];

    for (i, roles) in role_sets.iter().enumerate() {
        let subject = format!("subject-{}", i);
        let token = service.issue_access_token(&subject, roles, None).unwrap();
        let claims = service.verify_access_token(&token).await.unwrap();

        let expected: BTreeSet<String> = roles.iter().map(|r| r.to_string()).collect();
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.roles, expected);
    }
}

#[tokio::test]
async fn test_access_token_ids_never_repeat() {
    let (service, _clock) = service();
    let mut seen = HashSet::new();

    for _ in 0..10_000 {
        let token = service.issue_access_token("alice", &["user"], None).unwrap();
        let claims = service.verify_access_token(&token).await.unwrap();
        assert!(seen.insert(claims.jti));
    }
}

#[tokio::test]
async fn test_second_rotation_always_rejects() {
    let (service, clock) = service();

    let first = service.issue_refresh_token("alice", None).await.unwrap();
    let second = service.issue_refresh_token("alice", None).await.unwrap();

    clock.advance(Duration::minutes(9) + Duration::seconds(30));
    let fresh = service.issue_refresh_token("alice", None).await.unwrap();

    // Two accepted, one rejected and consumed
    assert!(service.rotate_refresh_token(&first).await.unwrap().is_accepted());
    assert!(service.rotate_refresh_token(&second).await.unwrap().is_accepted());
    assert!(!service.rotate_refresh_token(&fresh).await.unwrap().is_accepted());

    for token in [&first, &second, &fresh] {
        let outcome = service.rotate_refresh_token(token).await.unwrap();
        assert_eq!(outcome, RotationOutcome::Rejected(RejectReason::Unknown));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_rotation_single_winner() {
    let (service, clock) = service();
    let service = Arc::new(service);

    for _ in 0..50 {
        let token = service.issue_refresh_token("alice", None).await.unwrap();
        clock.advance(Duration::minutes(9) + Duration::seconds(30));

        let a = {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.rotate_refresh_token(&token).await })
        };
        let b = {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.rotate_refresh_token(&token).await })
        };

        let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let winners = outcomes.iter().filter(|o| o.is_accepted()).count();
        assert_eq!(winners, 1);

        service.purge_subject_tokens("alice").await.unwrap();
    }
}

#[tokio::test]
async fn test_blacklist_membership() {
    let (service, _clock) = service();

    service.blacklist("revoked-id").await.unwrap();
    assert!(service.is_blacklisted("revoked-id").await.unwrap());
    assert!(!service.is_blacklisted("never-revoked").await.unwrap());

    assert!(service.store().is_blacklisted("revoked-id").await.unwrap());
}

#[tokio::test]
async fn test_purge_invalidates_outstanding_tokens() {
    let (service, clock) = service();

    let tokens = vec![
        service.issue_refresh_token("alice", None).await.unwrap(),
        service.issue_refresh_token("alice", None).await.unwrap(),
        service.issue_refresh_token("alice", Some(Duration::days(30))).await.unwrap(),
    ];
    assert_eq!(service.purge_subject_tokens("alice").await.unwrap(), 3);

    clock.advance(Duration::minutes(9) + Duration::seconds(30));
    for token in &tokens {
        let outcome = service.rotate_refresh_token(token).await.unwrap();
        assert!(!outcome.is_accepted());
    }
}

#[tokio::test]
async fn test_shared_store_across_services() {
    let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    let clock = ManualClock::starting_now();

    let node_a =
        TokenService::with_clock(store.clone(), alice_config(), Arc::new(clock.clone())).unwrap();
    let node_b = TokenService::with_clock(store, alice_config(), Arc::new(clock.clone())).unwrap();

    let token = node_a.issue_access_token("alice", &["user"], None).unwrap();
    let claims = node_b.verify_access_token(&token).await.unwrap();
    node_a.blacklist_access_token(&token).await.unwrap();

    assert!(node_b.is_blacklisted(&claims.jti).await.unwrap());
    assert!(node_b.verify_access_token(&token).await.is_err());
}
