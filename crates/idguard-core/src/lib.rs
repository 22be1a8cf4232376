//! # idguard-core
//!
//! Core crate for IdGuard. Contains configuration schemas, the clock
//! abstraction, pagination types, telemetry setup, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other IdGuard crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod telemetry;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AppError;
pub use result::AppResult;
