//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::Role;
use super::status::UserStatus;

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name (uniqueness is case-insensitive).
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2id password digest (PHC string).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Human-readable display name.
    pub full_name: Option<String>,
    /// User role (RBAC).
    pub role: Role,
    /// Account status.
    pub status: UserStatus,
    /// Number of consecutive failed login attempts.
    pub failed_login_attempts: i32,
    /// Account locked until this time. `None` while locked means the lock
    /// is administrative and has no auto-expiry.
    pub locked_until: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the account is locked as observed at `now`.
    ///
    /// A lockout window that has elapsed no longer counts as locked, even
    /// before the lazy status write has happened; an administrative lock
    /// (no window) counts until explicitly unlocked.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        if self.status != UserStatus::Locked {
            return false;
        }
        match self.locked_until {
            Some(until) => now < until,
            None => true,
        }
    }

    /// Whether the account carries a lockout window that has already elapsed.
    pub fn lock_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == UserStatus::Locked
            && self.locked_until.is_some_and(|until| until <= now)
    }

    /// Whether the account may authenticate and hold valid sessions at `now`.
    pub fn can_authenticate(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            UserStatus::Active => true,
            UserStatus::Inactive => false,
            UserStatus::Locked => !self.is_locked(now) || self.lock_expired(now),
        }
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Initial plaintext password (hashed before storage, never persisted).
    pub password: String,
    /// Display name (optional).
    pub full_name: Option<String>,
    /// Assigned role.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user(status: UserStatus, locked_until: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "carol".into(),
            email: "carol@example.com".into(),
            password_hash: "$argon2id$...".into(),
            full_name: None,
            role: Role::Viewer,
            status,
            failed_login_attempts: 0,
            locked_until,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_lock_window_elapses() {
        let now = Utc::now();
        let user = sample_user(UserStatus::Locked, Some(now + Duration::minutes(30)));
        assert!(user.is_locked(now));
        assert!(!user.lock_expired(now));

        let later = now + Duration::minutes(31);
        assert!(!user.is_locked(later));
        assert!(user.lock_expired(later));
        assert!(user.can_authenticate(later));
    }

    #[test]
    fn test_administrative_lock_never_expires() {
        let now = Utc::now();
        let user = sample_user(UserStatus::Locked, None);
        assert!(user.is_locked(now + Duration::days(365)));
        assert!(!user.lock_expired(now + Duration::days(365)));
    }

    #[test]
    fn test_inactive_cannot_authenticate() {
        let user = sample_user(UserStatus::Inactive, None);
        assert!(!user.can_authenticate(Utc::now()));
    }
}
