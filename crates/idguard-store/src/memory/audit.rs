//! In-memory append-only audit store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use idguard_core::result::AppResult;
use idguard_entity::audit::{AuditEvent, AuditQuery, NewAuditEvent};

use crate::audit::AuditStore;

/// The trail and its sequence counter. Sequence assignment and the append
/// happen under the same lock, so sequences are gap-free even when a
/// concurrent writer is scheduled between the two steps.
#[derive(Debug, Default)]
struct Trail {
    next_sequence: i64,
    events: Vec<AuditEvent>,
}

/// In-memory audit store. Append-only by construction: nothing outside
/// this module can reach the backing Vec.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    trail: Mutex<Trail>,
}

impl MemoryAuditStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, event: &NewAuditEvent) -> AppResult<AuditEvent> {
        let mut trail = self.trail.lock().await;
        trail.next_sequence += 1;

        let stored = AuditEvent {
            sequence: trail.next_sequence,
            occurred_at: event.occurred_at,
            event_type: event.event_type,
            username: event.username.clone(),
            details: event.details.clone(),
            source_address: event.source_address.clone(),
        };
        trail.events.push(stored.clone());
        Ok(stored)
    }

    async fn query(&self, filter: &AuditQuery) -> AppResult<Vec<AuditEvent>> {
        let trail = self.trail.lock().await;
        Ok(trail
            .events
            .iter()
            .filter(|e| {
                filter
                    .username
                    .as_ref()
                    .is_none_or(|name| e.username.eq_ignore_ascii_case(name))
            })
            .filter(|e| filter.event_type.is_none_or(|ty| e.event_type == ty))
            .filter(|e| filter.since.is_none_or(|since| e.occurred_at >= since))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<u64> {
        let trail = self.trail.lock().await;
        Ok(trail.events.len() as u64)
    }
}
