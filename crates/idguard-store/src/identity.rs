//! Identity store trait: users, password history, and sessions.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use idguard_core::result::AppResult;
use idguard_core::types::pagination::{PageRequest, PageResponse};
use idguard_entity::session::Session;
use idguard_entity::user::{PasswordHistoryEntry, Role, User, UserStatus};

/// Result of recording a failed login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedLoginOutcome {
    /// The failure count after the increment.
    pub attempts: i32,
    /// Whether this increment performed the lock transition. At most one
    /// concurrent caller observes `true` per lock transition, so the
    /// ACCOUNT_LOCKED audit event is emitted exactly once.
    pub just_locked: bool,
}

/// Durable storage for users, their password history, and their sessions.
///
/// Implementations must make every method atomic: concurrent callers
/// referencing the same user or session may interleave arbitrarily, and
/// per-account counter updates must be linearizable (no lost increments).
/// Time is always passed in; the store never reads a clock.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    // ---- users ----

    /// Insert a new user. Fails with `Conflict` when the username
    /// (case-insensitive) or email is already taken.
    async fn create_user(&self, user: &User) -> AppResult<User>;

    /// Find a user by primary key.
    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by username (case-insensitive).
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Find a user by email (case-insensitive).
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// List users ordered by creation time, newest first.
    async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>>;

    /// Count total users.
    async fn count_users(&self) -> AppResult<u64>;

    /// Replace the active password digest.
    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Change the user's role, returning the updated user.
    async fn update_role(&self, user_id: Uuid, role: Role, at: DateTime<Utc>) -> AppResult<User>;

    /// Change the user's status, returning the updated user.
    async fn update_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> AppResult<User>;

    /// Record a successful login time.
    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Delete a user along with their password history and sessions.
    /// Returns `true` if a user was deleted.
    async fn delete_user(&self, user_id: Uuid) -> AppResult<bool>;

    // ---- lockout ----

    /// Atomically increment the failed-login counter and, when the count
    /// reaches `threshold`, transition the account to locked until
    /// `lock_until`. The increment and the transition commit together;
    /// two concurrent failures can never both observe the transition.
    async fn record_login_failure(
        &self,
        user_id: Uuid,
        threshold: i32,
        lock_until: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> AppResult<FailedLoginOutcome>;

    /// Reset the failed-login counter to zero.
    async fn reset_failed_attempts(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Lock the account. `until = None` is an administrative lock with no
    /// auto-expiry.
    async fn lock_user(
        &self,
        user_id: Uuid,
        until: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> AppResult<User>;

    /// Unlock the account and reset the failure counter.
    async fn unlock_user(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<User>;

    /// Lazily clear a lockout whose window has elapsed. The write is
    /// conditional on `observed_until` still being the stored window, so
    /// exactly one of any number of concurrent readers gets `true` and
    /// emits the audit event.
    async fn clear_expired_lock(
        &self,
        user_id: Uuid,
        observed_until: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    // ---- password history ----

    /// Retained password history for the user, newest first.
    async fn password_history(&self, user_id: Uuid) -> AppResult<Vec<PasswordHistoryEntry>>;

    /// Push a retired digest onto the history, evicting the oldest entries
    /// beyond `depth`.
    async fn push_password_history(
        &self,
        user_id: Uuid,
        password_hash: &str,
        depth: usize,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    // ---- sessions ----

    /// Insert a new session keyed by its token.
    async fn insert_session(&self, session: &Session) -> AppResult<()>;

    /// Find a session by token.
    async fn find_session(&self, token: &str) -> AppResult<Option<Session>>;

    /// Refresh the session's last-activity time.
    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> AppResult<()>;

    /// Delete a session. Returns `true` if a session existed.
    async fn delete_session(&self, token: &str) -> AppResult<bool>;

    /// Delete all sessions belonging to a user, returning the count.
    async fn delete_sessions_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// List sessions belonging to a user.
    async fn list_sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// List all sessions.
    async fn list_sessions(&self) -> AppResult<Vec<Session>>;

    /// Delete every session past either timeout, returning the count.
    /// Safe to call concurrently and repeatedly.
    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
        idle: Duration,
        absolute: Duration,
    ) -> AppResult<u64>;
}
