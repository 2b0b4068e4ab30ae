//! Application services and ports.

#![forbid(unsafe_code)]

mod access_control_ports;
mod access_control_service;
mod builtin_role_set;
mod registration_list;
mod requester;
mod role_registry;

pub use access_control_ports::{AccessControlStore, GetUserPermissionsQuery, UsersPermissions};
pub use access_control_service::{AccessControlService, SimplifiedUsersPermissions};
pub use builtin_role_set::BuiltinRoleSet;
pub use registration_list::RegistrationList;
pub use requester::{Requester, ScopesByAction, group_scopes_by_action};
pub use role_registry::RoleRegistry;
