//! In-memory identity store using a Tokio mutex for account state and a
//! concurrent map for sessions.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use idguard_core::error::AppError;
use idguard_core::result::AppResult;
use idguard_core::types::pagination::{PageRequest, PageResponse};
use idguard_entity::session::Session;
use idguard_entity::user::{PasswordHistoryEntry, Role, User, UserStatus};

use crate::identity::{FailedLoginOutcome, IdentityStore};

/// Account state guarded by a single mutex. Holding one lock across each
/// read-modify-write makes per-account counter updates linearizable.
#[derive(Debug, Default)]
struct Accounts {
    /// Users by id.
    users: HashMap<Uuid, User>,
    /// Password history by user id, newest first.
    history: HashMap<Uuid, VecDeque<PasswordHistoryEntry>>,
}

/// In-memory identity store.
///
/// Sessions live in a `DashMap` keyed by token: session operations are
/// commutative on their own record and need no cross-account coordination.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    accounts: Mutex<Accounts>,
    sessions: DashMap<String, Session>,
}

impl MemoryIdentityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_not_found(user_id: Uuid) -> AppError {
    AppError::not_found(format!("User {user_id} not found"))
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create_user(&self, user: &User) -> AppResult<User> {
        let mut accounts = self.accounts.lock().await;

        if accounts
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(AppError::conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        if accounts
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::conflict("Email already in use"));
        }

        accounts.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let accounts = self.accounts.lock().await;
        let mut users: Vec<User> = accounts.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(PageResponse::new(items, page, total))
    }

    async fn count_users(&self) -> AppResult<u64> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.users.len() as u64)
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = at;
        Ok(())
    }

    async fn update_role(&self, user_id: Uuid, role: Role, at: DateTime<Utc>) -> AppResult<User> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.role = role;
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> AppResult<User> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.status = status;
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.last_login_at = Some(at);
        user.updated_at = at;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> AppResult<bool> {
        let mut accounts = self.accounts.lock().await;
        let existed = accounts.users.remove(&user_id).is_some();
        accounts.history.remove(&user_id);
        drop(accounts);

        if existed {
            self.sessions.retain(|_, s| s.user_id != user_id);
        }
        Ok(existed)
    }

    async fn record_login_failure(
        &self,
        user_id: Uuid,
        threshold: i32,
        lock_until: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> AppResult<FailedLoginOutcome> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;

        user.failed_login_attempts += 1;
        user.updated_at = at;
        let attempts = user.failed_login_attempts;

        // The transition fires at most once per lock: an already-locked
        // account (including an administrative lock) is left untouched.
        let just_locked = attempts >= threshold && user.status != UserStatus::Locked;
        if just_locked {
            user.status = UserStatus::Locked;
            user.locked_until = Some(lock_until);
        }

        Ok(FailedLoginOutcome {
            attempts,
            just_locked,
        })
    }

    async fn reset_failed_attempts(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.failed_login_attempts = 0;
        user.updated_at = at;
        Ok(())
    }

    async fn lock_user(
        &self,
        user_id: Uuid,
        until: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> AppResult<User> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.status = UserStatus::Locked;
        user.locked_until = until;
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn unlock_user(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<User> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.status = UserStatus::Active;
        user.locked_until = None;
        user.failed_login_attempts = 0;
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn clear_expired_lock(
        &self,
        user_id: Uuid,
        observed_until: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut accounts = self.accounts.lock().await;
        let user = accounts
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;

        // Conditional on the observed window: only one of any number of
        // concurrent readers performs the write.
        if user.status == UserStatus::Locked && user.locked_until == Some(observed_until) {
            user.status = UserStatus::Active;
            user.locked_until = None;
            user.failed_login_attempts = 0;
            user.updated_at = at;
            return Ok(true);
        }
        Ok(false)
    }

    async fn password_history(&self, user_id: Uuid) -> AppResult<Vec<PasswordHistoryEntry>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .history
            .get(&user_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn push_password_history(
        &self,
        user_id: Uuid,
        password_hash: &str,
        depth: usize,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        let entries = accounts.history.entry(user_id).or_default();
        entries.push_front(PasswordHistoryEntry {
            user_id,
            password_hash: password_hash.to_string(),
            created_at: at,
        });
        entries.truncate(depth);
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> AppResult<()> {
        self.sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(token).map(|s| s.value().clone()))
    }

    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(mut session) = self.sessions.get_mut(token) {
            session.last_activity = at;
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> AppResult<bool> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - self.sessions.len()) as u64)
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_sessions(&self) -> AppResult<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
        idle: Duration,
        absolute: Duration,
    ) -> AppResult<u64> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.expired_by(now, idle, absolute).is_none());
        Ok((before - self.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn sample_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            full_name: None,
            role: Role::Viewer,
            status: UserStatus::Active,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[tokio::test]
    async fn test_username_uniqueness_is_case_insensitive() {
        let store = MemoryIdentityStore::new();
        store.create_user(&sample_user("dana")).await.unwrap();

        let mut dup = sample_user("DANA");
        dup.email = "other@example.com".to_string();
        let err = store.create_user(&dup).await.unwrap_err();
        assert_eq!(err.kind, idguard_core::error::ErrorKind::Conflict);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_failures_lock_exactly_once() {
        let store = Arc::new(MemoryIdentityStore::new());
        let user = sample_user("erin");
        store.create_user(&user).await.unwrap();

        let lock_until = Utc::now() + Duration::minutes(30);
        let mut handles = Vec::new();
        for _ in 0..5 {
            let store = Arc::clone(&store);
            let at = Utc::now();
            handles.push(tokio::spawn(async move {
                store.record_login_failure(user.id, 5, lock_until, at).await
            }));
        }

        let mut locked_count = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if outcome.just_locked {
                locked_count += 1;
            }
        }

        // No lost increments, and exactly one caller observed the transition.
        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 5);
        assert_eq!(stored.status, UserStatus::Locked);
        assert_eq!(locked_count, 1);
    }

    #[tokio::test]
    async fn test_history_evicts_beyond_depth() {
        let store = MemoryIdentityStore::new();
        let user = sample_user("frank");
        store.create_user(&user).await.unwrap();

        for i in 0..7 {
            store
                .push_password_history(user.id, &format!("hash-{i}"), 5, Utc::now())
                .await
                .unwrap();
        }

        let history = store.password_history(user.id).await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].password_hash, "hash-6");
        assert_eq!(history[4].password_hash, "hash-2");
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_sessions() {
        let store = MemoryIdentityStore::new();
        let user = sample_user("gail");
        store.create_user(&user).await.unwrap();

        let now = Utc::now();
        store
            .insert_session(&Session {
                token: "tok-1".into(),
                user_id: user.id,
                signature: "sig".into(),
                source_address: None,
                created_at: now,
                last_activity: now,
            })
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.find_session("tok-1").await.unwrap().is_none());
    }
}
