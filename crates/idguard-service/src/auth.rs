//! The caller-facing authentication contract.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use idguard_auth::password::{PasswordHasher, PasswordPolicy};
use idguard_auth::rbac::RbacEnforcer;
use idguard_auth::session::{SessionCheck, SessionManager};
use idguard_core::clock::Clock;
use idguard_core::config::auth::AuthConfig;
use idguard_core::error::AppError;
use idguard_core::result::AppResult;
use idguard_entity::audit::AuditEventType;
use idguard_entity::permission::Permission;
use idguard_entity::session::Session;
use idguard_entity::user::{User, UserStatus};
use idguard_store::IdentityStore;

use crate::audit::AuditLogger;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The created session. The token is the bearer credential.
    pub session: Session,
    /// The authenticated user.
    pub user: User,
}

/// The authentication facade.
///
/// Composes the identity store, the credential hasher, the session
/// manager, the RBAC engine, and the audit logger into the four
/// operations the surrounding application uses, plus self-service
/// password change. Construct one per process and share it; all
/// operations are safe under arbitrary concurrent interleavings.
#[derive(Clone)]
pub struct AuthService {
    /// Users, password history, and sessions.
    identity: Arc<dyn IdentityStore>,
    /// Session lifecycle mechanics.
    sessions: SessionManager,
    /// Audit event pipeline.
    audit: AuditLogger,
    /// Credential hasher.
    hasher: Arc<PasswordHasher>,
    /// Password policy.
    policy: PasswordPolicy,
    /// RBAC engine.
    rbac: Arc<RbacEnforcer>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Lockout and policy configuration.
    config: AuthConfig,
    /// Digest verified for unknown usernames so response timing does not
    /// reveal account existence.
    dummy_hash: String,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .finish()
    }
}

impl AuthService {
    /// Creates the facade. Hashes the timing-equalizer digest once up
    /// front, which blocks for one Argon2 derivation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        sessions: SessionManager,
        audit: AuditLogger,
        hasher: Arc<PasswordHasher>,
        policy: PasswordPolicy,
        rbac: Arc<RbacEnforcer>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> AppResult<Self> {
        let dummy_hash = hasher.hash_password("equalizer-credential-never-issued")?;

        Ok(Self {
            identity,
            sessions,
            audit,
            hasher,
            policy,
            rbac,
            clock,
            config,
            dummy_hash,
        })
    }

    /// Authenticates a user and issues a session.
    ///
    /// Failure modes (all audited before returning):
    /// - unknown username, wrong password, inactive account →
    ///   `InvalidCredentials` with the fixed generic message
    /// - locked account → `AccountLocked`
    ///
    /// The fifth consecutive failure locks the account for the configured
    /// window; the transition is linearizable against concurrent failures
    /// and is audited exactly once.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        source_address: Option<&str>,
    ) -> AppResult<LoginOutcome> {
        let Some(user) = self.identity.find_user_by_username(username).await? else {
            // Burn a verification against the equalizer digest so unknown
            // usernames cost the same as wrong passwords.
            let _ = self.hasher.verify_password(password, &self.dummy_hash);
            self.audit
                .log(
                    AuditEventType::LoginFailure,
                    username,
                    json!({"reason": "unknown_user"}),
                    source_address,
                )
                .await?;
            return Err(AppError::invalid_credentials());
        };

        let user = self.resolve_lock_expiry(user, source_address).await?;
        let now = self.clock.now();

        match user.status {
            UserStatus::Inactive => {
                self.audit
                    .log(
                        AuditEventType::LoginFailure,
                        &user.username,
                        json!({"reason": "account_inactive"}),
                        source_address,
                    )
                    .await?;
                return Err(AppError::invalid_credentials());
            }
            UserStatus::Locked if user.is_locked(now) => {
                self.audit
                    .log(
                        AuditEventType::LoginFailure,
                        &user.username,
                        json!({"reason": "account_locked"}),
                        source_address,
                    )
                    .await?;
                return Err(self.locked_error(&user));
            }
            _ => {}
        }

        // Blocking Argon2 derivation; no store lock is held here.
        let password_valid = self
            .hasher
            .verify_password(password, &user.password_hash)?;

        if !password_valid {
            return Err(self.handle_failed_login(&user, source_address).await?);
        }

        self.identity.reset_failed_attempts(user.id, now).await?;
        self.identity.update_last_login(user.id, now).await?;

        let session = self
            .sessions
            .create_session(user.id, source_address.map(String::from))
            .await?;

        self.audit
            .log(
                AuditEventType::LoginSuccess,
                &user.username,
                json!({}),
                source_address,
            )
            .await?;

        info!(user_id = %user.id, username = %user.username, "Login successful");

        Ok(LoginOutcome { session, user })
    }

    /// Validates a bearer token and returns the owning user.
    ///
    /// Fails closed with `Ok(None)` when the session is missing, fails
    /// signature verification, has passed a timeout, or is orphaned
    /// (owner deleted, inactive, or locked). Expired sessions are deleted
    /// and audited; on success the idle clock is reset.
    pub async fn validate_session(&self, token: &str) -> AppResult<Option<User>> {
        match self.sessions.check(token).await? {
            SessionCheck::Missing | SessionCheck::BadSignature => Ok(None),
            SessionCheck::Expired { session, cause } => {
                if let Some(user) = self.identity.find_user_by_id(session.user_id).await? {
                    self.audit
                        .log(
                            AuditEventType::SessionExpired,
                            &user.username,
                            json!({"cause": cause.as_str()}),
                            session.source_address.as_deref(),
                        )
                        .await?;
                }
                Ok(None)
            }
            SessionCheck::Valid(session) => {
                let Some(user) = self.identity.find_user_by_id(session.user_id).await? else {
                    // Orphaned: the owner is gone.
                    self.sessions.remove(&session.token).await?;
                    return Ok(None);
                };

                let user = self
                    .resolve_lock_expiry(user, session.source_address.as_deref())
                    .await?;

                if user.status != UserStatus::Active {
                    warn!(
                        user_id = %user.id,
                        status = %user.status,
                        "Session owner cannot authenticate; failing closed"
                    );
                    self.sessions.remove(&session.token).await?;
                    return Ok(None);
                }

                Ok(Some(user))
            }
        }
    }

    /// Deletes the session. Idempotent: logging out a nonexistent token is
    /// not an error, and the LOGOUT event is emitted only when a session
    /// actually existed.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        let session = self.identity.find_session(token).await?;
        let existed = self.sessions.remove(token).await?;

        if existed {
            if let Some(session) = session {
                let username = match self.identity.find_user_by_id(session.user_id).await? {
                    Some(user) => user.username,
                    None => session.user_id.to_string(),
                };
                self.audit
                    .log(
                        AuditEventType::Logout,
                        &username,
                        json!({}),
                        session.source_address.as_deref(),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Whether the user may exercise the permission right now.
    ///
    /// `false` for a missing, inactive, or locked subject, independent of
    /// role; otherwise a policy-table lookup.
    pub fn authorize(&self, user: Option<&User>, permission: Permission) -> bool {
        self.rbac.has_permission(user, self.clock.now(), permission)
    }

    /// Guard form of [`Self::authorize`]: audits the denial (capturing the
    /// checked permission for operators) and returns the generic error.
    pub async fn require_permission(
        &self,
        user: Option<&User>,
        permission: Permission,
        source_address: Option<&str>,
    ) -> AppResult<()> {
        if self.authorize(user, permission) {
            return Ok(());
        }

        let username = user.map(|u| u.username.as_str()).unwrap_or("unknown");
        self.audit
            .log(
                AuditEventType::AccessDenied,
                username,
                json!({"permission": permission.as_str()}),
                source_address,
            )
            .await?;
        Err(AppError::permission_denied())
    }

    /// Resolves the token or fails with a generic `SessionInvalid`,
    /// forcing re-authentication. The message never says whether the
    /// session was missing, expired, or orphaned.
    pub async fn require_session(&self, token: &str) -> AppResult<User> {
        self.validate_session(token).await?.ok_or_else(|| {
            AppError::session_invalid("Session is invalid or expired; please log in again")
        })
    }

    /// The guard contract for protected operations: resolves the token,
    /// then checks the permission.
    ///
    /// Both failure paths surface the same generic error, so callers
    /// cannot tell a dead session from a missing permission (the audit
    /// trail records the precise cause internally).
    pub async fn authorize_token(
        &self,
        token: &str,
        permission: Permission,
        source_address: Option<&str>,
    ) -> AppResult<User> {
        let Some(user) = self.validate_session(token).await? else {
            return Err(AppError::permission_denied());
        };

        self.require_permission(Some(&user), permission, source_address)
            .await?;
        Ok(user)
    }

    /// Changes the caller's own password.
    ///
    /// Requires the current password, enforces the policy, and rejects any
    /// secret still verifiable against the active digest or one of the
    /// retained history digests. Digests are salted, so the reuse check is
    /// a bounded loop of re-verifications, never a digest comparison.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .identity
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if !self
            .hasher
            .verify_password(current_password, &user.password_hash)?
        {
            return Err(AppError::invalid_credentials());
        }

        self.policy.validate(new_password)?;
        self.check_password_reuse(&user, new_password).await?;

        let new_hash = self.hasher.hash_password(new_password)?;
        let now = self.clock.now();

        self.identity
            .push_password_history(
                user.id,
                &user.password_hash,
                self.config.password_history_depth,
                now,
            )
            .await?;
        self.identity.update_password(user.id, &new_hash, now).await?;

        self.audit
            .log(
                AuditEventType::PasswordChanged,
                &user.username,
                json!({}),
                None,
            )
            .await?;

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Runs the bounded reuse check: the candidate secret against the
    /// active digest and each retained history digest.
    pub(crate) async fn check_password_reuse(
        &self,
        user: &User,
        candidate: &str,
    ) -> AppResult<()> {
        if self.hasher.verify_password(candidate, &user.password_hash)? {
            return Err(AppError::policy(
                "Password was used recently; choose a different password",
            ));
        }

        let history = self.identity.password_history(user.id).await?;
        for entry in &history {
            if self.hasher.verify_password(candidate, &entry.password_hash)? {
                return Err(AppError::policy(
                    "Password was used recently; choose a different password",
                ));
            }
        }
        Ok(())
    }

    /// Records a failed login, locking the account when the attempt count
    /// reaches the configured threshold. Returns the error to surface.
    async fn handle_failed_login(
        &self,
        user: &User,
        source_address: Option<&str>,
    ) -> AppResult<AppError> {
        let now = self.clock.now();
        let lock_until = now + self.config.lockout_duration();

        let outcome = self
            .identity
            .record_login_failure(user.id, self.config.max_failed_attempts, lock_until, now)
            .await?;

        self.audit
            .log(
                AuditEventType::LoginFailure,
                &user.username,
                json!({"reason": "invalid_password", "attempts": outcome.attempts}),
                source_address,
            )
            .await?;

        if outcome.just_locked {
            warn!(
                user_id = %user.id,
                username = %user.username,
                attempts = outcome.attempts,
                locked_until = %lock_until,
                "Account locked after repeated failed logins"
            );
            // Live sessions die with the lock.
            self.sessions.remove_for_user(user.id).await?;
            self.audit
                .log(
                    AuditEventType::AccountLocked,
                    &user.username,
                    json!({"auto": true, "locked_until": lock_until.to_rfc3339()}),
                    source_address,
                )
                .await?;
        }

        Ok(AppError::invalid_credentials())
    }

    /// Lazily clears a lockout whose window has elapsed. The conditional
    /// store write ensures exactly one concurrent reader performs the
    /// transition and emits the event; everyone gets the refreshed user.
    async fn resolve_lock_expiry(
        &self,
        user: User,
        source_address: Option<&str>,
    ) -> AppResult<User> {
        if !user.lock_expired(self.clock.now()) {
            return Ok(user);
        }
        // lock_expired guarantees a window is present.
        let Some(observed_until) = user.locked_until else {
            return Ok(user);
        };

        let cleared = self
            .identity
            .clear_expired_lock(user.id, observed_until, self.clock.now())
            .await?;

        if cleared {
            self.audit
                .log(
                    AuditEventType::AccountUnlocked,
                    &user.username,
                    json!({"auto": true}),
                    source_address,
                )
                .await?;
        }

        self.identity
            .find_user_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::not_found("User disappeared during lock expiry"))
    }

    /// Builds the `AccountLocked` error, including the remaining window
    /// when one exists. The message never states why the account is
    /// locked.
    fn locked_error(&self, user: &User) -> AppError {
        match user.locked_until {
            Some(until) => {
                let remaining_minutes = ((until - self.clock.now()).num_seconds() + 59) / 60;
                AppError::account_locked(format!(
                    "Account is locked; try again in {remaining_minutes} minutes"
                ))
            }
            None => AppError::account_locked("Account is locked; contact an administrator"),
        }
    }
}
