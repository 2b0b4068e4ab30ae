use std::sync::Arc;

use warden_core::{AppResult, OrgId, UserId};
use warden_domain::RoleRegistration;

use crate::{AccessControlStore, BuiltinRoleSet, RoleRegistry};

mod permissions;
mod simplified;


pub use simplified::SimplifiedUsersPermissions;

/// Application service resolving and summarizing principal permissions.
#[derive(Clone)]
pub struct AccessControlService {
    store: Arc<dyn AccessControlStore>,
    registry: Arc<RoleRegistry>,
    roles: Arc<BuiltinRoleSet>,
}

impl AccessControlService {
    /// Creates a service whose builtin roles carry no fixed-role permissions yet.
    #[must_use]
    pub fn new(store: Arc<dyn AccessControlStore>, registry: Arc<RoleRegistry>) -> Self {
        Self {
            store,
            registry,
            roles: Arc::new(BuiltinRoleSet::basic_role_definitions()),
        }
    }

    /// Replaces the builtin role set with a prepared one.
    #[must_use]
    pub fn with_builtin_roles(mut self, roles: BuiltinRoleSet) -> Self {
        self.roles = Arc::new(roles);
        self
    }

    /// Validates and records fixed-role declarations without touching builtin roles.
    pub fn declare_fixed_roles(&self, registrations: Vec<RoleRegistration>) -> AppResult<()> {
        self.registry.declare_fixed_roles(registrations)
    }

    /// Rebuilds the builtin role set from every declaration made so far.
    pub fn register_fixed_roles(&mut self) -> AppResult<()> {
        self.roles = Arc::new(self.registry.materialize()?);
        Ok(())
    }

    /// Returns the current builtin role set.
    #[must_use]
    pub fn builtin_roles(&self) -> &BuiltinRoleSet {
        self.roles.as_ref()
    }

    /// Removes a user's assignments and managed role.
    ///
    /// Removing from the global scope also drops grants scoped to the user.
    pub async fn delete_user_permissions(&self, org_id: OrgId, user_id: UserId) -> AppResult<()> {
        self.store.delete_user_permissions(org_id, user_id).await
    }
}
