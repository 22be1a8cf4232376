//! System permission identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A system-level permission, written as `resource:action`.
///
/// The set is closed; callers outside the subsystem see only the string
/// form. Which roles hold which permissions is defined by the RBAC policy
/// table, never by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    // Submission and document work (the surrounding application's domain;
    // opaque identifiers from this subsystem's point of view)
    /// Read submissions.
    #[serde(rename = "submission:read")]
    SubmissionRead,
    /// Create submissions.
    #[serde(rename = "submission:create")]
    SubmissionCreate,
    /// Update submissions.
    #[serde(rename = "submission:update")]
    SubmissionUpdate,
    /// Read generated documents.
    #[serde(rename = "document:read")]
    DocumentRead,
    /// Generate documents.
    #[serde(rename = "document:generate")]
    DocumentGenerate,

    // User management
    /// Create users.
    #[serde(rename = "user:create")]
    UserCreate,
    /// Read user accounts.
    #[serde(rename = "user:read")]
    UserRead,
    /// Update user accounts.
    #[serde(rename = "user:update")]
    UserUpdate,
    /// Delete users.
    #[serde(rename = "user:delete")]
    UserDelete,
    /// Change user roles.
    #[serde(rename = "user:change_role")]
    UserChangeRole,
    /// Reset user passwords.
    #[serde(rename = "user:reset_password")]
    UserResetPassword,
    /// Lock accounts.
    #[serde(rename = "user:lock")]
    UserLock,
    /// Unlock accounts.
    #[serde(rename = "user:unlock")]
    UserUnlock,

    // Session management
    /// View all active sessions.
    #[serde(rename = "session:view_all")]
    SessionViewAll,
    /// Terminate other users' sessions.
    #[serde(rename = "session:terminate")]
    SessionTerminate,

    // Audit trail
    /// Query the audit trail.
    #[serde(rename = "audit:view")]
    AuditView,
    /// Export audit events.
    #[serde(rename = "audit:export")]
    AuditExport,
}

impl Permission {
    /// Return the permission as its `resource:action` identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmissionRead => "submission:read",
            Self::SubmissionCreate => "submission:create",
            Self::SubmissionUpdate => "submission:update",
            Self::DocumentRead => "document:read",
            Self::DocumentGenerate => "document:generate",
            Self::UserCreate => "user:create",
            Self::UserRead => "user:read",
            Self::UserUpdate => "user:update",
            Self::UserDelete => "user:delete",
            Self::UserChangeRole => "user:change_role",
            Self::UserResetPassword => "user:reset_password",
            Self::UserLock => "user:lock",
            Self::UserUnlock => "user:unlock",
            Self::SessionViewAll => "session:view_all",
            Self::SessionTerminate => "session:terminate",
            Self::AuditView => "audit:view",
            Self::AuditExport => "audit:export",
        }
    }

    /// All defined permissions.
    pub fn all() -> &'static [Permission] {
        &[
            Self::SubmissionRead,
            Self::SubmissionCreate,
            Self::SubmissionUpdate,
            Self::DocumentRead,
            Self::DocumentGenerate,
            Self::UserCreate,
            Self::UserRead,
            Self::UserUpdate,
            Self::UserDelete,
            Self::UserChangeRole,
            Self::UserResetPassword,
            Self::UserLock,
            Self::UserUnlock,
            Self::SessionViewAll,
            Self::SessionTerminate,
            Self::AuditView,
            Self::AuditExport,
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = idguard_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| {
                idguard_core::AppError::validation(format!("Unknown permission: '{s}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_round_trip() {
        for permission in Permission::all() {
            assert_eq!(
                permission.as_str().parse::<Permission>().unwrap(),
                *permission
            );
        }
    }

    #[test]
    fn test_identifier_format() {
        for permission in Permission::all() {
            let s = permission.as_str();
            let (resource, action) = s.split_once(':').expect("resource:action form");
            assert!(!resource.is_empty());
            assert!(!action.is_empty());
        }
    }
}
