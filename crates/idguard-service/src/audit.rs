//! The audit event pipeline.

use std::sync::Arc;

use tracing::debug;

use idguard_core::clock::Clock;
use idguard_core::result::AppResult;
use idguard_entity::audit::{AuditEvent, AuditEventType, AuditQuery, NewAuditEvent};
use idguard_store::AuditStore;

/// Appends and queries audit events.
///
/// Writes go to the audit store synchronously; there is no deferred
/// queue, so a recorded operation and its audit event succeed or fail
/// together.
#[derive(Clone)]
pub struct AuditLogger {
    /// The append-only audit store.
    store: Arc<dyn AuditStore>,
    /// Time source for event timestamps.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish()
    }
}

impl AuditLogger {
    /// Creates a new audit logger.
    pub fn new(store: Arc<dyn AuditStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Appends an event and returns its assigned sequence number.
    pub async fn log(
        &self,
        event_type: AuditEventType,
        username: &str,
        details: serde_json::Value,
        source_address: Option<&str>,
    ) -> AppResult<i64> {
        let event = NewAuditEvent {
            occurred_at: self.clock.now(),
            event_type,
            username: username.to_string(),
            details,
            source_address: source_address.map(String::from),
        };

        let stored = self.store.append(&event).await?;
        debug!(
            sequence = stored.sequence,
            event = %event_type,
            username = %username,
            "Audit event recorded"
        );
        Ok(stored.sequence)
    }

    /// Queries events matching the filter, ordered by sequence ascending.
    pub async fn query(&self, filter: &AuditQuery) -> AppResult<Vec<AuditEvent>> {
        self.store.query(filter).await
    }
}
