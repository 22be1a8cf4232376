//! The acting principal for administrative calls.

use uuid::Uuid;

use idguard_entity::user::{Role, User};

/// Describes who is performing an operation.
///
/// Built from a user that has already passed session validation (active,
/// not locked); guards then only need the role and identity for the
/// permission check and audit attribution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The acting user's id.
    pub user_id: Uuid,
    /// The acting user's username, for audit attribution.
    pub username: String,
    /// The acting user's role.
    pub role: Role,
    /// Client address, if known.
    pub source_address: Option<String>,
}

impl RequestContext {
    /// Builds a context for a validated user.
    pub fn for_user(user: &User, source_address: Option<String>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            source_address,
        }
    }
}
