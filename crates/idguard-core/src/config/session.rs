//! Session management configuration.

use serde::{Deserialize, Serialize};

/// Session timeout configuration.
///
/// A session is valid only while *both* clocks are inside their windows:
/// the idle clock resets on every successful validation, the absolute
/// clock is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout in minutes before a session expires without activity.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,
    /// Absolute session timeout in hours (regardless of activity).
    #[serde(default = "default_absolute_timeout")]
    pub absolute_timeout_hours: u64,
    /// Interval for expired session cleanup in minutes. Cleanup is an
    /// optimization only; validation fails closed on expired sessions
    /// whether or not cleanup has run.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout(),
            absolute_timeout_hours: default_absolute_timeout(),
            cleanup_interval_minutes: default_cleanup_interval(),
        }
    }
}

impl SessionConfig {
    /// The idle timeout as a [`chrono::Duration`].
    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_timeout_minutes as i64)
    }

    /// The absolute timeout as a [`chrono::Duration`].
    pub fn absolute_timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(self.absolute_timeout_hours as i64)
    }
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_absolute_timeout() -> u64 {
    8
}

fn default_cleanup_interval() -> u64 {
    15
}
