//! Password history entry entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A retired password digest retained for reuse checking.
///
/// At most the N most recent entries are retained per user (store-enforced,
/// default 5). Because digests are salted, reuse checking re-verifies the
/// candidate secret against each entry rather than comparing digests.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordHistoryEntry {
    /// The owning user.
    pub user_id: Uuid,
    /// The retired Argon2id digest (PHC string).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When this digest was retired.
    pub created_at: DateTime<Utc>,
}
