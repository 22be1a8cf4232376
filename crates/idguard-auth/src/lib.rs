//! # idguard-auth
//!
//! Authentication mechanisms for IdGuard.
//!
//! ## Modules
//!
//! - `password` — Argon2id credential hashing and password policy enforcement
//! - `token` — opaque session token generation and HMAC integrity signing
//! - `session` — session lifecycle mechanics (create, check, remove, cleanup)
//! - `rbac` — role-based access control policy table and enforcement
//!
//! The credential and session flows that tie these mechanisms to the user
//! store and the audit trail live in `idguard-service`.

pub mod password;
pub mod rbac;
pub mod session;
pub mod token;

pub use password::{PasswordHasher, PasswordPolicy};
pub use rbac::{RbacEnforcer, RbacPolicies};
pub use session::{SessionCheck, SessionCleanup, SessionManager};
pub use token::TokenSigner;
