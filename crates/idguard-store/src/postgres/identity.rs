//! PostgreSQL identity store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use idguard_core::error::{AppError, ErrorKind};
use idguard_core::result::AppResult;
use idguard_core::types::pagination::{PageRequest, PageResponse};
use idguard_entity::session::Session;
use idguard_entity::user::{PasswordHistoryEntry, Role, User, UserStatus};

use crate::identity::{FailedLoginOutcome, IdentityStore};

/// PostgreSQL-backed identity store (users, password history, sessions).
#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    /// Create a new identity store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn create_user(&self, user: &User) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, full_name, role, status, \
                                failed_login_attempts, locked_until, created_at, updated_at, last_login_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.status)
        .bind(user.failed_login_attempts)
        .bind(user.locked_until)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("users_username_key") =>
            {
                AppError::conflict(format!("Username '{}' already exists", user.username))
            }
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
                AppError::conflict("Email already in use".to_string())
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create user", e),
        })
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
            })
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by email", e)
            })
    }

    async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count users", e))?;

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))?;

        Ok(PageResponse::new(users, page, total as u64))
    }

    async fn count_users(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count users", e))?;
        Ok(count as u64)
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(user_id)
                .bind(password_hash)
                .bind(at)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update password", e)
                })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {user_id} not found")));
        }
        Ok(())
    }

    async fn update_role(&self, user_id: Uuid, role: Role, at: DateTime<Utc>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(role)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update role", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(status)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update status", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
            })?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> AppResult<bool> {
        // Password history and sessions cascade via foreign keys.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete user", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_login_failure(
        &self,
        user_id: Uuid,
        threshold: i32,
        lock_until: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> AppResult<FailedLoginOutcome> {
        // The CTE takes the row lock before the previous status is read, so
        // concurrent failures serialize: no lost increments, and at most one
        // caller observes the lock transition.
        let row: Option<(i32, bool)> = sqlx::query_as(
            "WITH prev AS (SELECT status FROM users WHERE id = $1 FOR UPDATE) \
             UPDATE users u \
                SET failed_login_attempts = u.failed_login_attempts + 1, \
                    status = CASE WHEN u.failed_login_attempts + 1 >= $2 AND prev.status <> $5 \
                                  THEN $5 ELSE u.status END, \
                    locked_until = CASE WHEN u.failed_login_attempts + 1 >= $2 AND prev.status <> $5 \
                                        THEN $3 ELSE u.locked_until END, \
                    updated_at = $4 \
               FROM prev \
              WHERE u.id = $1 \
             RETURNING u.failed_login_attempts, (u.status = $5 AND prev.status <> $5)",
        )
        .bind(user_id)
        .bind(threshold)
        .bind(lock_until)
        .bind(at)
        .bind(UserStatus::Locked)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record login failure", e)
        })?;

        let (attempts, just_locked) =
            row.ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        Ok(FailedLoginOutcome {
            attempts,
            just_locked,
        })
    }

    async fn reset_failed_attempts(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET failed_login_attempts = 0, updated_at = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to reset failed attempts", e)
            })?;
        Ok(())
    }

    async fn lock_user(
        &self,
        user_id: Uuid,
        until: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, locked_until = $3, updated_at = $4 \
             WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(UserStatus::Locked)
        .bind(until)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock user", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    async fn unlock_user(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, locked_until = NULL, failed_login_attempts = 0, \
                              updated_at = $3 \
             WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(UserStatus::Active)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unlock user", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    async fn clear_expired_lock(
        &self,
        user_id: Uuid,
        observed_until: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        // Conditional on the observed window so exactly one concurrent
        // reader performs the write and logs the transition.
        let result = sqlx::query(
            "UPDATE users SET status = $4, locked_until = NULL, failed_login_attempts = 0, \
                              updated_at = $3 \
             WHERE id = $1 AND status = $5 AND locked_until = $2",
        )
        .bind(user_id)
        .bind(observed_until)
        .bind(at)
        .bind(UserStatus::Active)
        .bind(UserStatus::Locked)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to clear expired lock", e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn password_history(&self, user_id: Uuid) -> AppResult<Vec<PasswordHistoryEntry>> {
        sqlx::query_as::<_, PasswordHistoryEntry>(
            "SELECT user_id, password_hash, created_at FROM password_history \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load password history", e)
        })
    }

    async fn push_password_history(
        &self,
        user_id: Uuid,
        password_hash: &str,
        depth: usize,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query(
            "INSERT INTO password_history (user_id, password_hash, created_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to push password history", e)
        })?;

        sqlx::query(
            "DELETE FROM password_history WHERE user_id = $1 AND id NOT IN \
             (SELECT id FROM password_history WHERE user_id = $1 \
              ORDER BY created_at DESC, id DESC LIMIT $2)",
        )
        .bind(user_id)
        .bind(depth as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to trim password history", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }

    async fn insert_session(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, signature, source_address, created_at, last_activity) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(&session.signature)
        .bind(&session.source_address)
        .bind(session.created_at)
        .bind(session.last_activity)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert session", e))?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET last_activity = $2 WHERE token = $1")
            .bind(token)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to touch session", e)
            })?;
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete session", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete user sessions", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list user sessions", e))
    }

    async fn list_sessions(&self) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sessions", e))
    }

    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
        idle: Duration,
        absolute: Duration,
    ) -> AppResult<u64> {
        let absolute_cutoff = now - absolute;
        let idle_cutoff = now - idle;

        let result =
            sqlx::query("DELETE FROM sessions WHERE created_at <= $1 OR last_activity <= $2")
                .bind(absolute_cutoff)
                .bind(idle_cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to delete expired sessions",
                        e,
                    )
                })?;

        Ok(result.rows_affected())
    }
}
