//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Authentication, password policy, and lockout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for session token signing (HMAC-SHA256).
    #[serde(default = "default_signing_secret")]
    pub session_signing_secret: String,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Number of previous password digests retained and checked for reuse.
    #[serde(default = "default_history_depth")]
    pub password_history_depth: usize,
    /// Maximum consecutive failed login attempts before lockout.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: i32,
    /// Account lockout duration in minutes.
    #[serde(default = "default_lockout")]
    pub lockout_duration_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_signing_secret: default_signing_secret(),
            password_min_length: default_password_min(),
            password_history_depth: default_history_depth(),
            max_failed_attempts: default_max_failed(),
            lockout_duration_minutes: default_lockout(),
        }
    }
}

impl AuthConfig {
    /// The lockout window as a [`chrono::Duration`].
    pub fn lockout_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lockout_duration_minutes as i64)
    }
}

fn default_signing_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_password_min() -> usize {
    12
}

fn default_history_depth() -> usize {
    5
}

fn default_max_failed() -> i32 {
    5
}

fn default_lockout() -> u64 {
    30
}
