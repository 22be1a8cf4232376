//! End-to-end scenarios across the whole facade.

mod common;

use chrono::Duration;

use common::TestHarness;
use idguard_core::clock::Clock;
use idguard_core::error::ErrorKind;
use idguard_entity::permission::Permission;
use idguard_entity::user::{CreateUser, Role, UserStatus};
use idguard_store::IdentityStore;

#[tokio::test]
async fn test_analyst_workflow() {
    let h = TestHarness::new().await;

    // Create alice as an Analyst with a policy-compliant secret.
    h.admin
        .create_user(
            &h.admin_ctx(),
            CreateUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "Str0ng!Passw0rd".to_string(),
                full_name: Some("Alice Analyst".to_string()),
                role: Role::Analyst,
            },
        )
        .await
        .unwrap();

    // Login succeeds and returns a session.
    let outcome = h.auth.login("alice", "Str0ng!Passw0rd", None).await.unwrap();
    assert_eq!(outcome.user.role, Role::Analyst);

    // Analysts may create submissions but not delete users.
    assert!(h
        .auth
        .authorize(Some(&outcome.user), Permission::SubmissionCreate));
    assert!(!h.auth.authorize(Some(&outcome.user), Permission::UserDelete));

    // Logout invalidates the token.
    h.auth.logout(&outcome.session.token).await.unwrap();
    assert!(h
        .auth
        .validate_session(&outcome.session.token)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_lockout_and_recovery_workflow() {
    let h = TestHarness::new().await;
    let bob = h.create_user("bob", "B0b!SecretWord$", Role::Viewer).await;

    // Five failures with wrong secrets.
    for _ in 0..5 {
        assert!(h.auth.login("bob", "Wr0ng!Guess#123", None).await.is_err());
    }

    // Sixth attempt with the CORRECT secret still fails: locked.
    let err = h.auth.login("bob", "B0b!SecretWord$", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountLocked);

    // Past the lockout window, the correct secret works and the counter
    // has been reset.
    h.clock.advance(Duration::minutes(31));
    h.auth.login("bob", "B0b!SecretWord$", None).await.unwrap();

    let stored = h.identity.find_user_by_id(bob.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 0);
    assert_eq!(stored.status, UserStatus::Active);
}

#[tokio::test]
async fn test_authorize_denies_nil_inactive_and_locked_subjects() {
    let h = TestHarness::new().await;
    let alice = h.create_user("alice", "Str0ng!Passw0rd", Role::Admin).await;

    for permission in Permission::all() {
        assert!(!h.auth.authorize(None, *permission));
    }

    let inactive = h
        .identity
        .update_status(alice.id, UserStatus::Inactive, h.clock.now())
        .await
        .unwrap();
    for permission in Permission::all() {
        assert!(!h.auth.authorize(Some(&inactive), *permission));
    }

    let locked = h
        .identity
        .lock_user(alice.id, None, h.clock.now())
        .await
        .unwrap();
    for permission in Permission::all() {
        assert!(!h.auth.authorize(Some(&locked), *permission));
    }
}

#[tokio::test]
async fn test_role_change_takes_effect_on_next_validation() {
    let h = TestHarness::new().await;
    let alice = h.create_user("alice", "Str0ng!Passw0rd", Role::Analyst).await;
    let session = h
        .auth
        .login("alice", "Str0ng!Passw0rd", None)
        .await
        .unwrap()
        .session;

    h.admin
        .change_role(&h.admin_ctx(), alice.id, Role::Viewer)
        .await
        .unwrap();

    // The session survives, but permission resolution sees the new role.
    let user = h
        .auth
        .validate_session(&session.token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, Role::Viewer);
    assert!(!h.auth.authorize(Some(&user), Permission::SubmissionCreate));
}

#[tokio::test]
async fn test_guard_does_not_reveal_which_check_failed() {
    let h = TestHarness::new().await;
    h.create_user("victor", "V1ctor!Passw0rd", Role::Viewer).await;
    let session = h
        .auth
        .login("victor", "V1ctor!Passw0rd", None)
        .await
        .unwrap()
        .session;

    // Dead session vs. missing permission: identical caller-facing error.
    let no_session = h
        .auth
        .authorize_token("never-issued", Permission::SubmissionRead, None)
        .await
        .unwrap_err();
    let no_permission = h
        .auth
        .authorize_token(&session.token, Permission::UserDelete, None)
        .await
        .unwrap_err();

    assert_eq!(no_session.kind, ErrorKind::PermissionDenied);
    assert_eq!(no_permission.kind, ErrorKind::PermissionDenied);
    assert_eq!(no_session.message, no_permission.message);

    // The happy path returns the resolved user.
    let user = h
        .auth
        .authorize_token(&session.token, Permission::SubmissionRead, None)
        .await
        .unwrap();
    assert_eq!(user.username, "victor");
}

#[tokio::test]
async fn test_bootstrap_only_works_once() {
    let h = TestHarness::new().await;

    // The harness already bootstrapped `root`.
    let err = h
        .admin
        .bootstrap_admin(CreateUser {
            username: "intruder".to_string(),
            email: "intruder@example.com".to_string(),
            password: "Intrud3r!Secret".to_string(),
            full_name: None,
            role: Role::Admin,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_duplicate_username_and_email_are_conflicts() {
    let h = TestHarness::new().await;
    h.create_user("alice", "Str0ng!Passw0rd", Role::Analyst).await;

    let err = h
        .admin
        .create_user(
            &h.admin_ctx(),
            CreateUser {
                username: "ALICE".to_string(),
                email: "other@example.com".to_string(),
                password: "Str0ng!Passw0rd".to_string(),
                full_name: None,
                role: Role::Viewer,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = h
        .admin
        .create_user(
            &h.admin_ctx(),
            CreateUser {
                username: "alice2".to_string(),
                email: "ALICE@example.com".to_string(),
                password: "Str0ng!Passw0rd".to_string(),
                full_name: None,
                role: Role::Viewer,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}
