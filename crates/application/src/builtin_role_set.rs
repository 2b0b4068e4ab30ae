use std::collections::BTreeMap;

use warden_core::OrgId;
use warden_domain::{BasicRole, Permission, RoleDto};

/// In-memory permission sets of the builtin roles.
///
/// Built once by [`crate::RoleRegistry::materialize`] and read without locking afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuiltinRoleSet {
    roles: BTreeMap<BasicRole, RoleDto>,
}

impl BuiltinRoleSet {
    /// Returns one empty global role per builtin role.
    #[must_use]
    pub fn basic_role_definitions() -> Self {
        Self {
            roles: BasicRole::all()
                .iter()
                .map(|role| {
                    (
                        *role,
                        RoleDto::global(role.role_uid(), role.role_name(), 1),
                    )
                })
                .collect(),
        }
    }

    /// Creates a set from explicit role definitions.
    #[must_use]
    pub fn from_roles(roles: impl IntoIterator<Item = (BasicRole, RoleDto)>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    /// Returns the role backing a builtin role.
    #[must_use]
    pub fn get(&self, role: BasicRole) -> Option<&RoleDto> {
        self.roles.get(&role)
    }

    /// Returns the aggregated permissions of a builtin role.
    #[must_use]
    pub fn permissions(&self, role: BasicRole) -> &[Permission] {
        self.roles
            .get(&role)
            .map(|definition| definition.permissions.as_slice())
            .unwrap_or_default()
    }

    /// Returns permissions of the given roles that apply inside the organization.
    #[must_use]
    pub fn permissions_for(&self, roles: &[BasicRole], org_id: OrgId) -> Vec<Permission> {
        roles
            .iter()
            .filter_map(|role| self.roles.get(role))
            .filter(|definition| definition.applies_to(org_id))
            .flat_map(|definition| definition.permissions.iter().cloned())
            .collect()
    }

    /// Returns each role's permissions whose action starts with `action_prefix`.
    ///
    /// Roles with no matching permission are left out.
    #[must_use]
    pub fn permissions_with_prefix(
        &self,
        action_prefix: &str,
    ) -> BTreeMap<BasicRole, Vec<Permission>> {
        self.roles
            .iter()
            .filter_map(|(role, definition)| {
                let matching: Vec<Permission> = definition
                    .permissions
                    .iter()
                    .filter(|permission| permission.has_action_prefix(action_prefix))
                    .cloned()
                    .collect();
                (!matching.is_empty()).then_some((*role, matching))
            })
            .collect()
    }

    pub(crate) fn append_permissions(&mut self, role: BasicRole, permissions: &[Permission]) {
        self.roles
            .entry(role)
            .or_insert_with(|| RoleDto::global(role.role_uid(), role.role_name(), 1))
            .permissions
            .extend_from_slice(permissions);
    }
}
