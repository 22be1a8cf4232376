//! PostgreSQL audit store implementation.
//!
//! The audit database is distinct from the identity database; this store
//! receives its own pool. Sequence numbers come from an identity column,
//! so assignment is serialized by the database and stays gap-free under
//! concurrent writers. A trigger rejects UPDATE and DELETE at the schema
//! level in addition to the trait exposing no mutation.

use async_trait::async_trait;
use sqlx::PgPool;

use idguard_core::error::{AppError, ErrorKind};
use idguard_core::result::AppResult;
use idguard_entity::audit::{AuditEvent, AuditQuery, NewAuditEvent};

use crate::audit::AuditStore;

/// PostgreSQL-backed append-only audit store.
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    /// Create a new audit store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, event: &NewAuditEvent) -> AppResult<AuditEvent> {
        sqlx::query_as::<_, AuditEvent>(
            "INSERT INTO audit_events (occurred_at, event_type, username, details, source_address) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING sequence, occurred_at, event_type, username, details, source_address",
        )
        .bind(event.occurred_at)
        .bind(event.event_type)
        .bind(&event.username)
        .bind(&event.details)
        .bind(&event.source_address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append audit event", e))
    }

    async fn query(&self, filter: &AuditQuery) -> AppResult<Vec<AuditEvent>> {
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        if filter.username.is_some() {
            conditions.push(format!("LOWER(username) = LOWER(${param_idx})"));
            param_idx += 1;
        }
        if filter.event_type.is_some() {
            conditions.push(format!("event_type = ${param_idx}"));
            param_idx += 1;
        }
        if filter.since.is_some() {
            conditions.push(format!("occurred_at >= ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT sequence, occurred_at, event_type, username, details, source_address \
             FROM audit_events {where_clause} ORDER BY sequence ASC LIMIT ${param_idx}"
        );

        let mut query = sqlx::query_as::<_, AuditEvent>(&sql);
        if let Some(ref username) = filter.username {
            query = query.bind(username.clone());
        }
        if let Some(event_type) = filter.event_type {
            query = query.bind(event_type);
        }
        if let Some(since) = filter.since {
            query = query.bind(since);
        }

        query
            .bind(filter.limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to query audit log", e))
    }

    async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count audit events", e)
            })?;
        Ok(count as u64)
    }
}
