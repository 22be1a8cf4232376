//! Login, lockout, and lazy lock expiry.

mod common;

use std::sync::Arc;

use chrono::Duration;

use common::TestHarness;
use idguard_core::clock::Clock;
use idguard_core::error::ErrorKind;
use idguard_entity::audit::{AuditEventType, AuditQuery};
use idguard_entity::user::{Role, UserStatus};
use idguard_store::IdentityStore;

const SECRET: &str = "Correct!Horse9Battery";

#[tokio::test]
async fn test_login_success_returns_session() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;

    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();
    assert_eq!(outcome.user.username, "alice");
    assert!(!outcome.session.token.is_empty());
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_share_a_message() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;

    let unknown = h.auth.login("mallory", SECRET, None).await.unwrap_err();
    let wrong = h.auth.login("alice", "Wrong!Pass9word", None).await.unwrap_err();

    assert_eq!(unknown.kind, ErrorKind::InvalidCredentials);
    assert_eq!(wrong.kind, ErrorKind::InvalidCredentials);
    assert_eq!(unknown.message, wrong.message);
}

#[tokio::test]
async fn test_fifth_failure_locks_and_correct_secret_is_rejected() {
    let h = TestHarness::new().await;
    let bob = h.create_user("bob", SECRET, Role::Viewer).await;

    for _ in 0..5 {
        let err = h.auth.login("bob", "Wrong!Pass9word", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
    }

    let stored = h.identity.find_user_by_id(bob.id).await.unwrap().unwrap();
    assert_eq!(stored.status, UserStatus::Locked);
    assert_eq!(stored.failed_login_attempts, 5);

    // Sixth attempt with the CORRECT secret still fails, as locked.
    let err = h.auth.login("bob", SECRET, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountLocked);

    // Exactly one ACCOUNT_LOCKED event was recorded.
    let locked_events = h
        .admin
        .query_audit(
            &h.admin_ctx(),
            &AuditQuery {
                username: Some("bob".to_string()),
                event_type: Some(AuditEventType::AccountLocked),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(locked_events.len(), 1);
}

#[tokio::test]
async fn test_lockout_window_elapse_allows_login_and_resets_counter() {
    let h = TestHarness::new().await;
    let bob = h.create_user("bob", SECRET, Role::Viewer).await;

    for _ in 0..5 {
        let _ = h.auth.login("bob", "Wrong!Pass9word", None).await;
    }
    assert_eq!(
        h.auth.login("bob", SECRET, None).await.unwrap_err().kind,
        ErrorKind::AccountLocked
    );

    // Past the 30-minute window the next read clears the lock lazily.
    h.clock.advance(Duration::minutes(31));
    let outcome = h.auth.login("bob", SECRET, None).await.unwrap();
    assert_eq!(outcome.user.username, "bob");

    let stored = h.identity.find_user_by_id(bob.id).await.unwrap().unwrap();
    assert_eq!(stored.status, UserStatus::Active);
    assert_eq!(stored.failed_login_attempts, 0);

    // The lazy transition was audited.
    let unlocked = h
        .admin
        .query_audit(
            &h.admin_ctx(),
            &AuditQuery {
                username: Some("bob".to_string()),
                event_type: Some(AuditEventType::AccountUnlocked),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].details["auto"], serde_json::json!(true));
}

#[tokio::test]
async fn test_success_resets_the_failure_counter() {
    let h = TestHarness::new().await;
    let carol = h.create_user("carol", SECRET, Role::Analyst).await;

    // 4 failures, 1 success, 4 more failures: never locked.
    for _ in 0..4 {
        let _ = h.auth.login("carol", "Wrong!Pass9word", None).await;
    }
    h.auth.login("carol", SECRET, None).await.unwrap();

    for _ in 0..4 {
        let _ = h.auth.login("carol", "Wrong!Pass9word", None).await;
    }

    let stored = h.identity.find_user_by_id(carol.id).await.unwrap().unwrap();
    assert_eq!(stored.status, UserStatus::Active);
    assert_eq!(stored.failed_login_attempts, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_failures_do_not_undercount_or_double_lock() {
    let h = Arc::new(TestHarness::new().await);
    let dave = h.create_user("dave", SECRET, Role::Viewer).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.auth.login("dave", "Wrong!Pass9word", None).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }

    let stored = h.identity.find_user_by_id(dave.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 5);
    assert_eq!(stored.status, UserStatus::Locked);

    let locked_events = h
        .admin
        .query_audit(
            &h.admin_ctx(),
            &AuditQuery {
                username: Some("dave".to_string()),
                event_type: Some(AuditEventType::AccountLocked),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(locked_events.len(), 1, "the lock transition logged once");
}

#[tokio::test]
async fn test_inactive_account_is_rejected_generically() {
    let h = TestHarness::new().await;
    let eve = h.create_user("eve", SECRET, Role::Viewer).await;
    h.identity
        .update_status(eve.id, UserStatus::Inactive, h.clock.now())
        .await
        .unwrap();

    let err = h.auth.login("eve", SECRET, None).await.unwrap_err();
    // Inactive accounts are indistinguishable from bad credentials.
    assert_eq!(err.kind, ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn test_administrative_lock_does_not_expire() {
    let h = TestHarness::new().await;
    let frank = h.create_user("frank", SECRET, Role::Viewer).await;

    h.admin.lock_user(&h.admin_ctx(), frank.id).await.unwrap();
    h.clock.advance(Duration::days(30));

    let err = h.auth.login("frank", SECRET, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountLocked);

    // Administrative unlock restores access and the counter.
    h.admin.unlock_user(&h.admin_ctx(), frank.id).await.unwrap();
    h.auth.login("frank", SECRET, None).await.unwrap();
}
