//! Session validation, expiry, logout, and fail-closed behavior.

mod common;

use chrono::Duration;

use common::TestHarness;
use idguard_entity::audit::{AuditEventType, AuditQuery};
use idguard_entity::user::Role;
use idguard_store::IdentityStore;

const SECRET: &str = "Correct!Horse9Battery";

#[tokio::test]
async fn test_session_valid_with_activity_inside_idle_window() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;
    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();

    h.clock.advance(Duration::minutes(29));
    let user = h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap();
    assert_eq!(user.unwrap().username, "alice");
}

#[tokio::test]
async fn test_session_invalid_after_31_idle_minutes() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;
    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();

    h.clock.advance(Duration::minutes(31));
    assert!(h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());

    // The timeout was audited as SESSION_EXPIRED with its cause.
    let expired = h
        .admin
        .query_audit(
            &h.admin_ctx(),
            &AuditQuery {
                username: Some("alice".to_string()),
                event_type: Some(AuditEventType::SessionExpired),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].details["cause"], serde_json::json!("idle"));
}

#[tokio::test]
async fn test_session_invalid_after_absolute_timeout_despite_activity() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;
    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();

    // Keep the idle clock fresh all the way to 8h01m.
    for _ in 0..16 {
        h.clock.advance(Duration::minutes(29));
        assert!(h
            .auth
            .validate_session(&outcome.session.token)
            .await
            .unwrap()
            .is_some());
    }
    h.clock.advance(Duration::minutes(17));

    assert!(h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_logout_deletes_the_session_and_is_idempotent() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;
    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();

    h.auth.logout(&outcome.session.token).await.unwrap();
    assert!(h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());

    // Logging out again (or a token that never existed) is not an error.
    h.auth.logout(&outcome.session.token).await.unwrap();
    h.auth.logout("never-issued").await.unwrap();

    // require_session surfaces the generic re-authentication error.
    let err = h
        .auth
        .require_session(&outcome.session.token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, idguard_core::error::ErrorKind::SessionInvalid);

    // LOGOUT was emitted exactly once, for the real logout.
    let logouts = h
        .admin
        .query_audit(
            &h.admin_ctx(),
            &AuditQuery {
                username: Some("alice".to_string()),
                event_type: Some(AuditEventType::Logout),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(logouts.len(), 1);
}

#[tokio::test]
async fn test_session_fails_closed_when_owner_is_locked() {
    let h = TestHarness::new().await;
    let alice = h.create_user("alice", SECRET, Role::Analyst).await;
    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();

    h.admin.lock_user(&h.admin_ctx(), alice.id).await.unwrap();

    assert!(h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_session_fails_closed_when_owner_is_deleted() {
    let h = TestHarness::new().await;
    let alice = h.create_user("alice", SECRET, Role::Analyst).await;
    let outcome = h.auth.login("alice", SECRET, None).await.unwrap();

    h.admin.delete_user(&h.admin_ctx(), alice.id).await.unwrap();

    assert!(h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());
    // The record itself is gone too.
    assert!(h
        .identity
        .find_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_admin_session_listing_and_termination() {
    let h = TestHarness::new().await;
    h.create_user("alice", SECRET, Role::Analyst).await;
    h.create_user("bob", SECRET, Role::Viewer).await;

    let alice_session = h.auth.login("alice", SECRET, None).await.unwrap().session;
    let _bob_session = h.auth.login("bob", SECRET, None).await.unwrap().session;

    let active = h.admin.list_active_sessions(&h.admin_ctx()).await.unwrap();
    assert_eq!(active.len(), 2);

    h.admin
        .terminate_session(&h.admin_ctx(), &alice_session.token)
        .await
        .unwrap();

    let active = h.admin.list_active_sessions(&h.admin_ctx()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(h
        .auth
        .validate_session(&alice_session.token)
        .await
        .unwrap()
        .is_none());
}
