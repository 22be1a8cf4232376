//! Administrative operations — user management, session oversight, and
//! audit queries.
//!
//! Every operation begins with an explicit permission guard; a denied
//! guard is audited (with the checked permission in the details) and
//! surfaces the generic error.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use idguard_auth::password::{PasswordHasher, PasswordPolicy};
use idguard_auth::rbac::RbacEnforcer;
use idguard_auth::session::SessionManager;
use idguard_core::clock::Clock;
use idguard_core::config::auth::AuthConfig;
use idguard_core::error::AppError;
use idguard_core::result::AppResult;
use idguard_core::types::pagination::{PageRequest, PageResponse};
use idguard_entity::audit::{AuditEvent, AuditEventType, AuditQuery};
use idguard_entity::permission::Permission;
use idguard_entity::session::Session;
use idguard_entity::user::{CreateUser, Role, User, UserStatus};
use idguard_store::IdentityStore;

use crate::audit::AuditLogger;
use crate::auth::AuthService;
use crate::context::RequestContext;

/// The administrative facade, consumed by an external CLI.
#[derive(Clone)]
pub struct AdminService {
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
    /// Caller-facing facade, reused for the password reuse check.
    auth: AuthService,
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService")
            .field("config", &self.config)
            .finish()
    }
}

impl AdminService {
    /// Creates the administrative facade.
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
        auth: AuthService,
    ) -> Self {
        Self {
            identity,
            sessions,
            audit,
            hasher,
            policy,
            rbac,
            clock,
            config,
            auth,
        }
    }

    /// Permission guard for administrative calls. The context comes from a
    /// validated session, so only the role membership is checked here; a
    /// denial is audited with the permission that was refused.
    async fn guard(&self, ctx: &RequestContext, permission: Permission) -> AppResult<()> {
        if self.rbac.role_has_permission(ctx.role, permission) {
            return Ok(());
        }

        self.audit
            .log(
                AuditEventType::AccessDenied,
                &ctx.username,
                json!({"permission": permission.as_str()}),
                ctx.source_address.as_deref(),
            )
            .await?;
        Err(AppError::permission_denied())
    }

    /// Creates a new user account.
    pub async fn create_user(&self, ctx: &RequestContext, req: CreateUser) -> AppResult<User> {
        self.guard(ctx, Permission::UserCreate).await?;
        self.insert_user(req, Some(ctx)).await
    }

    /// Seeds the first administrator on an empty identity store.
    ///
    /// The only unguarded write path: there is no acting principal before
    /// the first account exists. Fails with `Conflict` once any user does.
    pub async fn bootstrap_admin(&self, req: CreateUser) -> AppResult<User> {
        if self.identity.count_users().await? > 0 {
            return Err(AppError::conflict(
                "Bootstrap is only available on an empty user store",
            ));
        }

        let req = CreateUser {
            role: Role::Admin,
            ..req
        };
        self.insert_user(req, None).await
    }

    /// Lists users, newest first.
    pub async fn list_users(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<User>> {
        self.guard(ctx, Permission::UserRead).await?;
        self.identity.list_users(page).await
    }

    /// Fetches a single user.
    pub async fn get_user(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<User> {
        self.guard(ctx, Permission::UserRead).await?;
        self.identity
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Deletes a user along with their sessions and password history.
    /// Existing audit events keep the denormalized username.
    pub async fn delete_user(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<()> {
        self.guard(ctx, Permission::UserDelete).await?;

        let user = self
            .identity
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        self.identity.delete_user(user_id).await?;

        self.audit
            .log(
                AuditEventType::UserDeleted,
                &user.username,
                json!({"deleted_by": ctx.username}),
                ctx.source_address.as_deref(),
            )
            .await?;

        info!(user_id = %user_id, username = %user.username, "User deleted");
        Ok(())
    }

    /// Locks an account administratively (no auto-expiry).
    pub async fn lock_user(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<User> {
        self.guard(ctx, Permission::UserLock).await?;

        let user = self.identity.lock_user(user_id, None, self.clock.now()).await?;

        // Live sessions fail closed on their next validation; drop them now
        // so the lock takes effect immediately.
        self.sessions.remove_for_user(user_id).await?;

        self.audit
            .log(
                AuditEventType::AccountLocked,
                &user.username,
                json!({"auto": false, "locked_by": ctx.username}),
                ctx.source_address.as_deref(),
            )
            .await?;
        Ok(user)
    }

    /// Unlocks an account and resets its failure counter.
    pub async fn unlock_user(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<User> {
        self.guard(ctx, Permission::UserUnlock).await?;

        let user = self.identity.unlock_user(user_id, self.clock.now()).await?;

        self.audit
            .log(
                AuditEventType::AccountUnlocked,
                &user.username,
                json!({"auto": false, "unlocked_by": ctx.username}),
                ctx.source_address.as_deref(),
            )
            .await?;
        Ok(user)
    }

    /// Changes a user's role.
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: Role,
    ) -> AppResult<User> {
        self.guard(ctx, Permission::UserChangeRole).await?;

        let before = self
            .identity
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let user = self.identity.update_role(user_id, role, self.clock.now()).await?;

        self.audit
            .log(
                AuditEventType::RoleChanged,
                &user.username,
                json!({
                    "from": before.role.as_str(),
                    "to": role.as_str(),
                    "changed_by": ctx.username,
                }),
                ctx.source_address.as_deref(),
            )
            .await?;
        Ok(user)
    }

    /// Resets a user's password without requiring the current one.
    ///
    /// The new secret passes the same policy and reuse checks as a
    /// self-service change, and the user's sessions are dropped to force
    /// re-authentication.
    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        new_password: &str,
    ) -> AppResult<()> {
        self.guard(ctx, Permission::UserResetPassword).await?;

        let user = self
            .identity
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        self.policy.validate(new_password)?;
        self.auth.check_password_reuse(&user, new_password).await?;

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
        self.sessions.remove_for_user(user.id).await?;

        self.audit
            .log(
                AuditEventType::PasswordReset,
                &user.username,
                json!({"reset_by": ctx.username}),
                ctx.source_address.as_deref(),
            )
            .await?;

        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Lists sessions currently inside both timeout windows.
    pub async fn list_active_sessions(&self, ctx: &RequestContext) -> AppResult<Vec<Session>> {
        self.guard(ctx, Permission::SessionViewAll).await?;
        self.sessions.list_active().await
    }

    /// Terminates another user's session. Audited as a LOGOUT performed by
    /// the administrator.
    pub async fn terminate_session(&self, ctx: &RequestContext, token: &str) -> AppResult<()> {
        self.guard(ctx, Permission::SessionTerminate).await?;

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
                        json!({"terminated_by": ctx.username}),
                        ctx.source_address.as_deref(),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Queries the audit trail.
    pub async fn query_audit(
        &self,
        ctx: &RequestContext,
        filter: &AuditQuery,
    ) -> AppResult<Vec<AuditEvent>> {
        self.guard(ctx, Permission::AuditView).await?;
        self.audit.query(filter).await
    }

    /// Validates, hashes, inserts, and audits a new account.
    async fn insert_user(&self, req: CreateUser, ctx: Option<&RequestContext>) -> AppResult<User> {
        let username = req.username.trim();
        if username.len() < 3 {
            return Err(AppError::validation(
                "Username must be at least 3 characters",
            ));
        }
        if !req.email.contains('@') || !req.email.contains('.') {
            return Err(AppError::validation("Invalid email format"));
        }

        if self
            .identity
            .find_user_by_username(username)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Username is already taken"));
        }
        if self.identity.find_user_by_email(&req.email).await?.is_some() {
            return Err(AppError::conflict("Email is already in use"));
        }

        self.policy.validate(&req.password)?;
        let password_hash = self.hasher.hash_password(&req.password)?;

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: req.email,
            password_hash,
            full_name: req.full_name,
            role: req.role,
            status: UserStatus::Active,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        // The store re-checks uniqueness atomically on insert.
        let user = self.identity.create_user(&user).await?;

        self.audit
            .log(
                AuditEventType::UserCreated,
                &user.username,
                json!({
                    "role": user.role.as_str(),
                    "created_by": ctx.map(|c| c.username.as_str()),
                }),
                ctx.and_then(|c| c.source_address.as_deref()),
            )
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }
}
