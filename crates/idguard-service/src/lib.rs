//! # idguard-service
//!
//! The IdGuard facade: composes the stores and the auth mechanisms into
//! the operations the rest of the application calls. This crate is the
//! sole writer of users, sessions, and audit events.
//!
//! - [`AuthService`] — the caller-facing contract: login, session
//!   validation, logout, authorization, and self-service password change
//! - [`AdminService`] — guarded administrative operations consumed by an
//!   external CLI
//! - [`AuditLogger`] — the audit event pipeline
//!
//! Every security-relevant operation writes its audit event synchronously
//! as part of the operation; a failed audit append fails the operation.

pub mod admin;
pub mod audit;
pub mod auth;
pub mod context;

pub use admin::AdminService;
pub use audit::AuditLogger;
pub use auth::{AuthService, LoginOutcome};
pub use context::RequestContext;
