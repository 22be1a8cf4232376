//! Role-to-permission mapping definitions.

use std::collections::{HashMap, HashSet};

use idguard_entity::permission::Permission;
use idguard_entity::user::Role;

/// Defines the mapping from each role to its set of allowed permissions.
///
/// Every role carries an explicit set. Admin happens to be a strict
/// superset of Analyst, which is a superset of Viewer, but nothing may
/// rely on that: the engine answers every question from this table.
#[derive(Debug, Clone)]
pub struct RbacPolicies {
    /// Role → set of permissions.
    policies: HashMap<Role, HashSet<Permission>>,
}

impl RbacPolicies {
    /// Creates the default policy set.
    pub fn new() -> Self {
        let mut policies = HashMap::new();

        // Viewer: read-only access to submissions and documents
        let viewer: HashSet<Permission> = [Permission::SubmissionRead, Permission::DocumentRead]
            .into_iter()
            .collect();
        policies.insert(Role::Viewer, viewer);

        // Analyst: viewer + submission and document work
        let analyst: HashSet<Permission> = [
            Permission::SubmissionRead,
            Permission::SubmissionCreate,
            Permission::SubmissionUpdate,
            Permission::DocumentRead,
            Permission::DocumentGenerate,
        ]
        .into_iter()
        .collect();
        policies.insert(Role::Analyst, analyst);

        // Admin: everything
        let admin: HashSet<Permission> = Permission::all().iter().copied().collect();
        policies.insert(Role::Admin, admin);

        Self { policies }
    }

    /// Returns the set of permissions for the given role.
    pub fn permissions_for_role(&self, role: Role) -> HashSet<Permission> {
        self.policies.get(&role).cloned().unwrap_or_default()
    }

    /// Checks whether the given role has the specified permission.
    pub fn role_has_permission(&self, role: Role, permission: Permission) -> bool {
        self.policies
            .get(&role)
            .map(|perms| perms.contains(&permission))
            .unwrap_or(false)
    }
}

impl Default for RbacPolicies {
    fn default() -> Self {
        Self::new()
    }
}
