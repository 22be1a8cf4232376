//! Shared test harness: the full service stack over in-memory stores and
//! a manually advanced clock.

use std::sync::Arc;

use idguard_auth::password::{PasswordHasher, PasswordPolicy};
use idguard_auth::rbac::RbacEnforcer;
use idguard_auth::session::SessionManager;
use idguard_auth::token::TokenSigner;
use idguard_core::clock::ManualClock;
use idguard_core::config::auth::AuthConfig;
use idguard_core::config::session::SessionConfig;
use idguard_entity::user::{CreateUser, Role, User};
use idguard_service::{AdminService, AuditLogger, AuthService, RequestContext};
use idguard_store::{AuditStore, IdentityStore, MemoryAuditStore, MemoryIdentityStore};

/// Password for the bootstrap administrator.
pub const ADMIN_PASSWORD: &str = "R00t!Admin#Pass";

pub struct TestHarness {
    pub auth: AuthService,
    pub admin: AdminService,
    pub identity: Arc<MemoryIdentityStore>,
    pub audit_store: Arc<MemoryAuditStore>,
    pub clock: Arc<ManualClock>,
    pub root: User,
}

impl TestHarness {
    /// Builds the stack and seeds the bootstrap admin (`root`).
    pub async fn new() -> Self {
        let identity = Arc::new(MemoryIdentityStore::new());
        let audit_store = Arc::new(MemoryAuditStore::new());
        let clock = Arc::new(ManualClock::from_system_time());

        let auth_config = AuthConfig::default();
        let session_config = SessionConfig::default();

        let hasher = Arc::new(PasswordHasher::new());
        let policy = PasswordPolicy::new(&auth_config);
        let rbac = Arc::new(RbacEnforcer::new());
        let signer = TokenSigner::new(&auth_config.session_signing_secret);

        let identity_store: Arc<dyn IdentityStore> = identity.clone();
        let audit_trail: Arc<dyn AuditStore> = audit_store.clone();

        let sessions = SessionManager::new(
            identity_store.clone(),
            signer,
            clock.clone(),
            session_config,
        );
        let audit_logger = AuditLogger::new(audit_trail, clock.clone());

        let auth = AuthService::new(
            identity_store.clone(),
            sessions.clone(),
            audit_logger.clone(),
            hasher.clone(),
            policy.clone(),
            rbac.clone(),
            clock.clone(),
            auth_config.clone(),
        )
        .expect("failed to build auth service");

        let admin = AdminService::new(
            identity_store,
            sessions,
            audit_logger,
            hasher,
            policy,
            rbac,
            clock.clone(),
            auth_config,
            auth.clone(),
        );

        let root = admin
            .bootstrap_admin(CreateUser {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                password: ADMIN_PASSWORD.to_string(),
                full_name: None,
                role: Role::Admin,
            })
            .await
            .expect("failed to bootstrap admin");

        Self {
            auth,
            admin,
            identity,
            audit_store,
            clock,
            root,
        }
    }

    /// A context acting as the bootstrap admin.
    pub fn admin_ctx(&self) -> RequestContext {
        RequestContext::for_user(&self.root, None)
    }

    /// Creates a user through the admin surface.
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> User {
        self.admin
            .create_user(
                &self.admin_ctx(),
                CreateUser {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password: password.to_string(),
                    full_name: None,
                    role,
                },
            )
            .await
            .expect("failed to create user")
    }
}
