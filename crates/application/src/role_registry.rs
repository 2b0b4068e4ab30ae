use tracing::{debug, info};
use warden_core::AppResult;
use warden_domain::{RoleRegistration, expand_grants};

use crate::{BuiltinRoleSet, RegistrationList};

/// Validates fixed-role declarations and derives builtin role permission sets.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    registrations: RegistrationList,
}

impl RoleRegistry {
    /// Creates a registry with no declarations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and appends a batch of registrations.
    ///
    /// A single invalid entry rejects the whole batch.
    pub fn declare_fixed_roles(&self, registrations: Vec<RoleRegistration>) -> AppResult<()> {
        for registration in &registrations {
            registration.validate()?;
        }

        let count = registrations.len();
        self.registrations.append(registrations)?;
        debug!(count, "declared fixed roles");

        Ok(())
    }

    /// Returns the accumulated registrations.
    pub fn registrations(&self) -> AppResult<Vec<RoleRegistration>> {
        self.registrations.snapshot()
    }

    /// Rebuilds the builtin role set from every registration.
    ///
    /// A grant to a builtin role also reaches every more senior builtin role.
    pub fn materialize(&self) -> AppResult<BuiltinRoleSet> {
        let registrations = self.registrations.snapshot()?;
        let mut roles = BuiltinRoleSet::basic_role_definitions();

        for registration in &registrations {
            let grants = registration.validate()?;
            for role in expand_grants(&grants) {
                roles.append_permissions(role, &registration.role.permissions);
            }
        }

        info!(
            registrations = registrations.len(),
            "materialized builtin role permissions"
        );

        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use warden_core::RegistrationError;
    use warden_domain::{BasicRole, Permission, RoleDto, RoleRegistration, expand_grants};

    use super::RoleRegistry;

    fn registration(name: &str, permissions: Vec<Permission>, grants: &[&str]) -> RoleRegistration {
        RoleRegistration::new(
            RoleDto::global("", name, 1).with_permissions(permissions),
            grants.iter().copied(),
        )
    }

    #[test]
    fn declare_accepts_empty_batch() {
        let registry = RoleRegistry::new();
        assert!(registry.declare_fixed_roles(Vec::new()).is_ok());
        assert!(registry.registrations().unwrap_or_default().is_empty());
    }

    #[test]
    fn declare_adds_every_registration_of_a_batch() {
        let registry = RoleRegistry::new();
        let result = registry.declare_fixed_roles(vec![
            registration("fixed:test:test", Vec::new(), &["Admin"]),
            registration("fixed:test2:test2", Vec::new(), &["Admin"]),
        ]);

        assert!(result.is_ok());
        assert_eq!(registry.registrations().unwrap_or_default().len(), 2);
    }

    #[test]
    fn declare_rejects_missing_fixed_prefix() {
        let registry = RoleRegistry::new();
        let result = registry.declare_fixed_roles(vec![registration(
            "custom:test:test",
            Vec::new(),
            &["Admin"],
        )]);

        let error = result.err();
        assert!(matches!(
            error.as_ref().and_then(|error| error.as_registration_error()),
            Some(RegistrationError::FixedRolePrefixMissing { .. })
        ));
    }

    #[test]
    fn declare_rejects_unknown_builtin_role() {
        let registry = RoleRegistry::new();
        let result = registry.declare_fixed_roles(vec![registration(
            "fixed:test:test",
            Vec::new(),
            &["WrongAdmin"],
        )]);

        let error = result.err();
        assert!(matches!(
            error.as_ref().and_then(|error| error.as_registration_error()),
            Some(RegistrationError::InvalidBuiltinRole { .. })
        ));
    }

    #[test]
    fn invalid_entry_aborts_the_whole_batch() {
        let registry = RoleRegistry::new();
        assert!(
            registry
                .declare_fixed_roles(vec![registration("fixed:kept", Vec::new(), &["Viewer"])])
                .is_ok()
        );

        let result = registry.declare_fixed_roles(vec![
            registration("fixed:valid", Vec::new(), &["Editor"]),
            registration("fixed:invalid", Vec::new(), &["Owner"]),
        ]);
        assert!(result.is_err());

        let names: Vec<String> = registry
            .registrations()
            .unwrap_or_default()
            .into_iter()
            .map(|registration| registration.role.name)
            .collect();
        assert_eq!(names, vec!["fixed:kept".to_owned()]);
    }

    #[test]
    fn admin_grant_reaches_admin_and_grafana_admin_only() {
        let registry = RoleRegistry::new();
        let permission = Permission::unscoped("test:test");
        assert!(
            registry
                .declare_fixed_roles(vec![registration(
                    "fixed:test:test",
                    vec![permission.clone()],
                    &["Admin"],
                )])
                .is_ok()
        );

        let roles = registry.materialize().unwrap_or_default();
        assert!(roles.permissions(BasicRole::Admin).contains(&permission));
        assert!(roles.permissions(BasicRole::GrafanaAdmin).contains(&permission));
        assert!(!roles.permissions(BasicRole::Editor).contains(&permission));
        assert!(!roles.permissions(BasicRole::Viewer).contains(&permission));
    }

    #[test]
    fn materialize_grants_parents_of_every_registration() {
        let registry = RoleRegistry::new();
        let registrations = vec![
            registration(
                "fixed:test:test",
                vec![Permission::unscoped("test:test")],
                &["Editor"],
            ),
            registration(
                "fixed:test2:test2",
                vec![
                    Permission::unscoped("test:test2"),
                    Permission::new("test:test3", "test:*"),
                ],
                &["Viewer"],
            ),
        ];
        assert!(registry.declare_fixed_roles(registrations.clone()).is_ok());

        let roles = registry.materialize().unwrap_or_default();
        for registration in &registrations {
            let grants = registration.validate().unwrap_or_default();
            for role in expand_grants(&grants) {
                for permission in &registration.role.permissions {
                    assert!(roles.permissions(role).contains(permission));
                }
            }
        }
        assert_eq!(roles.permissions(BasicRole::Viewer).len(), 2);
        assert_eq!(roles.permissions(BasicRole::GrafanaAdmin).len(), 3);
    }

    #[test]
    fn materialize_is_idempotent() {
        let registry = RoleRegistry::new();
        assert!(
            registry
                .declare_fixed_roles(vec![registration(
                    "fixed:teams:reader",
                    vec![Permission::new("teams:read", "teams:*")],
                    &["Viewer"],
                )])
                .is_ok()
        );

        let first = registry.materialize().unwrap_or_default();
        let second = registry.materialize().unwrap_or_default();
        assert_eq!(first, second);
        assert_eq!(first.permissions(BasicRole::GrafanaAdmin).len(), 1);
    }

    #[test]
    fn later_declarations_are_picked_up_by_a_full_rebuild() {
        let registry = RoleRegistry::new();
        assert!(
            registry
                .declare_fixed_roles(vec![registration(
                    "fixed:a",
                    vec![Permission::unscoped("a:read")],
                    &["Viewer"],
                )])
                .is_ok()
        );
        let before = registry.materialize().unwrap_or_default();

        assert!(
            registry
                .declare_fixed_roles(vec![registration(
                    "fixed:b",
                    vec![Permission::unscoped("b:read")],
                    &["Grafana Admin"],
                )])
                .is_ok()
        );
        let after = registry.materialize().unwrap_or_default();

        assert_eq!(before.permissions(BasicRole::Viewer).len(), 1);
        assert_eq!(after.permissions(BasicRole::Viewer).len(), 1);
        assert_eq!(after.permissions(BasicRole::GrafanaAdmin).len(), 2);
    }

    #[test]
    fn senior_roles_hold_a_superset_of_junior_roles() {
        let registry = RoleRegistry::new();
        assert!(
            registry
                .declare_fixed_roles(vec![
                    registration("fixed:v", vec![Permission::unscoped("v:read")], &["Viewer"]),
                    registration("fixed:e", vec![Permission::unscoped("e:read")], &["Editor"]),
                    registration("fixed:a", vec![Permission::unscoped("a:read")], &["Admin"]),
                    registration(
                        "fixed:g",
                        vec![Permission::unscoped("g:read")],
                        &["Grafana Admin"],
                    ),
                ])
                .is_ok()
        );

        let roles = registry.materialize().unwrap_or_default();
        for pair in BasicRole::all().windows(2) {
            let junior = roles.permissions(pair[0]);
            let senior = roles.permissions(pair[1]);
            assert!(junior.iter().all(|permission| senior.contains(permission)));
            assert!(senior.len() > junior.len());
        }
    }
}
