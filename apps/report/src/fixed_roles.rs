use warden_domain::{Permission, RoleDto, RoleRegistration, actions, scopes};

/// Fixed roles this process contributes to the builtin role hierarchy.
pub(crate) fn declarations() -> Vec<RoleRegistration> {
    vec![
        RoleRegistration::new(
            RoleDto::global("fixed_teams_reader", "fixed:teams:reader", 1).with_permissions(vec![
                Permission::new(actions::TEAMS_READ, scopes::TEAMS_ALL),
            ]),
            ["Viewer"],
        ),
        RoleRegistration::new(
            RoleDto::global("fixed_teams_creator", "fixed:teams:creator", 1)
                .with_permissions(vec![Permission::unscoped(actions::TEAMS_CREATE)]),
            ["Editor"],
        ),
        RoleRegistration::new(
            RoleDto::global("fixed_teams_writer", "fixed:teams:writer", 1).with_permissions(vec![
                Permission::new(actions::TEAMS_WRITE, scopes::TEAMS_ALL),
                Permission::new(actions::TEAMS_PERMISSIONS_READ, scopes::TEAMS_ALL),
                Permission::new(actions::TEAMS_PERMISSIONS_WRITE, scopes::TEAMS_ALL),
            ]),
            ["Admin"],
        ),
        RoleRegistration::new(
            RoleDto::global(
                "fixed_users_permissions_reader",
                "fixed:users.permissions:reader",
                1,
            )
            .with_permissions(vec![Permission::new(
                actions::USERS_PERMISSIONS_READ,
                scopes::USERS_ALL,
            )]),
            ["Admin"],
        ),
        RoleRegistration::new(
            RoleDto::global("fixed_users_creator", "fixed:users:creator", 1)
                .with_permissions(vec![Permission::unscoped(actions::USERS_CREATE)]),
            ["Grafana Admin"],
        ),
    ]
}
