//! Audit event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::event_type::AuditEventType;

/// An immutable audit trail entry.
///
/// Ordering is by `sequence`, not by wall-clock time: the store assigns
/// strictly monotonic, gap-free sequence numbers under concurrent writers.
/// The username is denormalized so the record survives user deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEvent {
    /// Monotonic, gap-free sequence number assigned by the store.
    pub sequence: i64,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// The type of event.
    pub event_type: AuditEventType,
    /// The subject's username at the time of the event.
    pub username: String,
    /// Structured event details (JSON).
    pub details: serde_json::Value,
    /// Client address, if known.
    pub source_address: Option<String>,
}

/// Data required to append a new audit event. The store assigns the
/// sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEvent {
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// The type of event.
    pub event_type: AuditEventType,
    /// The subject's username.
    pub username: String,
    /// Structured event details.
    pub details: serde_json::Value,
    /// Client address, if known.
    pub source_address: Option<String>,
}

/// Filters for querying the audit trail. Results are ordered by sequence
/// ascending within the filtered set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Restrict to events for this username.
    pub username: Option<String>,
    /// Restrict to a single event type.
    pub event_type: Option<AuditEventType>,
    /// Restrict to events at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of events returned.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            username: None,
            event_type: None,
            since: None,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u64 {
    100
}
