//! Session entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Why a session is no longer valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryCause {
    /// No activity inside the idle window.
    Idle,
    /// The session outlived its absolute lifetime.
    Absolute,
}

impl ExpiryCause {
    /// Return the cause as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Absolute => "absolute",
        }
    }
}

/// An authenticated session identified by an opaque bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Opaque bearer token (≥ 512 bits of entropy, base64-url).
    pub token: String,
    /// The owning user.
    pub user_id: Uuid,
    /// HMAC-SHA256 integrity tag over token and user id, computed with a
    /// server-held secret.
    pub signature: String,
    /// Client address at login, if known.
    pub source_address: Option<String>,
    /// When the session was created. The absolute clock runs from here.
    pub created_at: DateTime<Utc>,
    /// Last successful validation. The idle clock runs from here.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Evaluates both expiry clocks at `now`.
    ///
    /// Returns `None` while the session is inside both windows. Absolute
    /// expiry wins when both clocks have run out.
    pub fn expired_by(
        &self,
        now: DateTime<Utc>,
        idle: Duration,
        absolute: Duration,
    ) -> Option<ExpiryCause> {
        if now - self.created_at >= absolute {
            return Some(ExpiryCause::Absolute);
        }
        if now - self.last_activity >= idle {
            return Some(ExpiryCause::Idle);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(created_at: DateTime<Utc>) -> Session {
        Session {
            token: "tok".into(),
            user_id: Uuid::new_v4(),
            signature: "sig".into(),
            source_address: None,
            created_at,
            last_activity: created_at,
        }
    }

    #[test]
    fn test_valid_inside_both_windows() {
        let start = Utc::now();
        let session = session_at(start);
        let now = start + Duration::minutes(29);
        assert_eq!(
            session.expired_by(now, Duration::minutes(30), Duration::hours(8)),
            None
        );
    }

    #[test]
    fn test_idle_expiry_at_boundary() {
        let start = Utc::now();
        let session = session_at(start);
        let now = start + Duration::minutes(30);
        assert_eq!(
            session.expired_by(now, Duration::minutes(30), Duration::hours(8)),
            Some(ExpiryCause::Idle)
        );
    }

    #[test]
    fn test_absolute_expiry_despite_activity() {
        let start = Utc::now();
        let mut session = session_at(start);
        session.last_activity = start + Duration::hours(8) - Duration::minutes(1);
        let now = start + Duration::hours(8) + Duration::minutes(1);
        assert_eq!(
            session.expired_by(now, Duration::minutes(30), Duration::hours(8)),
            Some(ExpiryCause::Absolute)
        );
    }
}
