//! Audit event type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of security-relevant event types recorded in the audit
/// trail. Both success and failure paths are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_event_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// Successful authentication.
    LoginSuccess,
    /// Failed authentication attempt (wrong secret, unknown user, or
    /// blocked account; the precise cause lives in the event details).
    LoginFailure,
    /// Explicit session termination by the user.
    Logout,
    /// A user account was created.
    UserCreated,
    /// A user account was deleted.
    UserDeleted,
    /// A user changed their own password.
    PasswordChanged,
    /// An administrator reset a user's password.
    PasswordReset,
    /// An account transitioned to locked (lockout or administrative).
    AccountLocked,
    /// An account transitioned to unlocked (window elapsed or administrative).
    AccountUnlocked,
    /// A user's role was changed.
    RoleChanged,
    /// A permission check was denied.
    AccessDenied,
    /// A session expired (idle or absolute timeout).
    SessionExpired,
}

impl AuditEventType {
    /// Return the canonical event code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILURE",
            Self::Logout => "LOGOUT",
            Self::UserCreated => "USER_CREATED",
            Self::UserDeleted => "USER_DELETED",
            Self::PasswordChanged => "PASSWORD_CHANGED",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AccountUnlocked => "ACCOUNT_UNLOCKED",
            Self::RoleChanged => "ROLE_CHANGED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::SessionExpired => "SESSION_EXPIRED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = idguard_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOGIN_SUCCESS" => Ok(Self::LoginSuccess),
            "LOGIN_FAILURE" => Ok(Self::LoginFailure),
            "LOGOUT" => Ok(Self::Logout),
            "USER_CREATED" => Ok(Self::UserCreated),
            "USER_DELETED" => Ok(Self::UserDeleted),
            "PASSWORD_CHANGED" => Ok(Self::PasswordChanged),
            "PASSWORD_RESET" => Ok(Self::PasswordReset),
            "ACCOUNT_LOCKED" => Ok(Self::AccountLocked),
            "ACCOUNT_UNLOCKED" => Ok(Self::AccountUnlocked),
            "ROLE_CHANGED" => Ok(Self::RoleChanged),
            "ACCESS_DENIED" => Ok(Self::AccessDenied),
            "SESSION_EXPIRED" => Ok(Self::SessionExpired),
            _ => Err(idguard_core::AppError::validation(format!(
                "Unknown audit event type: '{s}'"
            ))),
        }
    }
}
