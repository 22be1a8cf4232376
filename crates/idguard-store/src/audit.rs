//! Audit store trait: the append-only event sink.

use async_trait::async_trait;

use idguard_core::result::AppResult;
use idguard_entity::audit::{AuditEvent, AuditQuery, NewAuditEvent};

/// Durable, append-only storage for audit events.
///
/// There is deliberately no update or delete operation: the trail is
/// append-only in the public contract, and the physical store is separate
/// from the identity store. Sequence assignment must be serialized so
/// sequences are strictly monotonic and gap-free under concurrent writers.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    /// Append an event, assigning the next sequence number. Returns the
    /// stored event.
    async fn append(&self, event: &NewAuditEvent) -> AppResult<AuditEvent>;

    /// Query events matching the filter, ordered by sequence ascending.
    async fn query(&self, filter: &AuditQuery) -> AppResult<Vec<AuditEvent>>;

    /// Count total events.
    async fn count(&self) -> AppResult<u64>;
}
