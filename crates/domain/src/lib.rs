//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod permission;
mod role;

pub use permission::{
    Permission, SimplifiedUserPermission, actions, is_wildcard_for, resource_of, scope,
    scope_identifier, scope_matches, scopes,
};
pub use role::{
    BASIC_ROLE_PREFIX, BasicRole, FIXED_ROLE_PREFIX, MANAGED_ROLE_PREFIX, OrgRole, RoleDto,
    RoleRegistration, expand_grants, managed_team_role_name, managed_user_role_name,
};
