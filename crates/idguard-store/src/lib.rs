//! # idguard-store
//!
//! Store traits and backends for the two logically separate IdGuard stores:
//!
//! - the **identity store** (users, password history, sessions)
//! - the **audit store** (append-only audit events)
//!
//! Each store has two backends:
//!
//! - PostgreSQL (for deployments), one pool and migration set per store
//! - In-memory (for single-node use and tests)
//!
//! The audit store is physically separate from the identity store to
//! preserve an independent tamper-evidence boundary; a backend must never
//! share tables between the two.

pub mod audit;
pub mod identity;
pub mod memory;
pub mod postgres;

pub use audit::AuditStore;
pub use identity::{FailedLoginOutcome, IdentityStore};
pub use memory::{MemoryAuditStore, MemoryIdentityStore};
pub use postgres::{PostgresAuditStore, PostgresIdentityStore};
