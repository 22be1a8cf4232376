//! RBAC enforcement — checks whether a user may exercise a permission.

use chrono::{DateTime, Utc};

use idguard_core::error::AppError;
use idguard_entity::permission::Permission;
use idguard_entity::user::{Role, User, UserStatus};

use super::policies::RbacPolicies;

/// Enforces role-based access control.
///
/// Denials are generic: the error never reveals whether the subject was
/// missing, inactive, locked, or simply lacked the permission.
#[derive(Debug, Clone, Default)]
pub struct RbacEnforcer {
    /// The policy configuration.
    policies: RbacPolicies,
}

impl RbacEnforcer {
    /// Creates a new enforcer with the default policy set.
    pub fn new() -> Self {
        Self {
            policies: RbacPolicies::new(),
        }
    }

    /// Creates an enforcer with custom policies.
    pub fn with_policies(policies: RbacPolicies) -> Self {
        Self { policies }
    }

    /// Whether the user holds the permission at `now`.
    ///
    /// `false` for a missing subject, an inactive account, or an account
    /// still inside a lock; otherwise a membership test against the policy
    /// table for the user's role.
    pub fn has_permission(
        &self,
        user: Option<&User>,
        now: DateTime<Utc>,
        permission: Permission,
    ) -> bool {
        let Some(user) = user else {
            return false;
        };
        if user.status == UserStatus::Inactive {
            return false;
        }
        if user.is_locked(now) {
            return false;
        }
        self.policies.role_has_permission(user.role, permission)
    }

    /// Guard form of [`Self::has_permission`]: `Ok(())` or a generic
    /// `PermissionDenied`.
    pub fn require_permission(
        &self,
        user: Option<&User>,
        now: DateTime<Utc>,
        permission: Permission,
    ) -> Result<(), AppError> {
        if self.has_permission(user, now, permission) {
            Ok(())
        } else {
            Err(AppError::permission_denied())
        }
    }

    /// Membership test by role alone, for callers that have already
    /// resolved and vetted the subject.
    pub fn role_has_permission(&self, role: Role, permission: Permission) -> bool {
        self.policies.role_has_permission(role, permission)
    }

    /// Returns a reference to the underlying policies.
    pub fn policies(&self) -> &RbacPolicies {
        &self.policies
    }
}
