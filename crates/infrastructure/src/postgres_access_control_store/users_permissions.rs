use std::str::FromStr;

use tracing::debug;
use warden_core::GLOBAL_ORG_ID;
use warden_domain::{BasicRole, OrgRole};

use super::*;

#[derive(Debug, FromRow)]
struct UserPermissionRow {
    user_id: i64,
    action: String,
    scope: String,
}

#[derive(Debug, FromRow)]
struct UserBasicRoleRow {
    user_id: i64,
    role: Option<String>,
    is_admin: bool,
}

impl PostgresAccessControlStore {
    pub(super) async fn get_users_permissions_impl(
        &self,
        org_id: OrgId,
        action_prefix: &str,
    ) -> AppResult<UsersPermissions> {
        let mut transaction = self.begin().await?;

        let permission_rows = sqlx::query_as::<_, UserPermissionRow>(
            r#"
            SELECT user_permissions.user_id, user_permissions.action, user_permissions.scope
            FROM (
                SELECT user_roles.user_id, user_roles.org_id,
                    permissions.action, permissions.scope
                FROM rbac_permissions AS permissions
                INNER JOIN rbac_user_roles AS user_roles
                    ON user_roles.role_id = permissions.role_id
                UNION
                SELECT team_members.user_id, team_roles.org_id,
                    permissions.action, permissions.scope
                FROM rbac_permissions AS permissions
                INNER JOIN rbac_team_roles AS team_roles
                    ON team_roles.role_id = permissions.role_id
                INNER JOIN team_members
                    ON team_members.team_id = team_roles.team_id
                UNION
                SELECT org_users.user_id, builtin_roles.org_id,
                    permissions.action, permissions.scope
                FROM rbac_permissions AS permissions
                INNER JOIN rbac_builtin_roles AS builtin_roles
                    ON builtin_roles.role_id = permissions.role_id
                INNER JOIN org_users
                    ON org_users.role = builtin_roles.role
                    AND org_users.org_id = $1
                UNION
                SELECT users.id AS user_id, builtin_roles.org_id,
                    permissions.action, permissions.scope
                FROM rbac_permissions AS permissions
                INNER JOIN rbac_builtin_roles AS builtin_roles
                    ON builtin_roles.role_id = permissions.role_id
                CROSS JOIN users
                WHERE users.is_admin
                    AND builtin_roles.role = $3
                    AND builtin_roles.org_id = $2
            ) AS user_permissions
            WHERE user_permissions.org_id IN ($1, $2)
                AND starts_with(user_permissions.action, $4)
            ORDER BY user_permissions.user_id
            "#,
        )
        .bind(org_id.value())
        .bind(GLOBAL_ORG_ID.value())
        .bind(BasicRole::GrafanaAdmin.as_str())
        .bind(action_prefix)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to load users permissions: {error}")))?;

        let role_rows = sqlx::query_as::<_, UserBasicRoleRow>(
            r#"
            SELECT users.id AS user_id, org_users.role, users.is_admin
            FROM users
            LEFT JOIN org_users
                ON org_users.user_id = users.id
                AND org_users.org_id = $1
            WHERE users.is_admin
                OR org_users.org_id IS NOT NULL
            ORDER BY users.id
            "#,
        )
        .bind(org_id.value())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to load users roles: {error}")))?;

        commit(transaction).await?;

        let mut users_permissions = UsersPermissions::default();
        for row in permission_rows {
            users_permissions
                .permissions
                .entry(UserId::new(row.user_id))
                .or_default()
                .push(Permission::new(row.action, row.scope));
        }

        for row in role_rows {
            let mut roles = Vec::new();
            if let Some(role) = row.role.as_deref() {
                let org_role = OrgRole::from_str(role).map_err(|error| {
                    AppError::Internal(format!(
                        "failed to decode org role '{role}' for user '{}': {error}",
                        row.user_id
                    ))
                })?;
                roles.push(org_role.as_basic_role());
            }
            if row.is_admin {
                roles.push(BasicRole::GrafanaAdmin);
            }
            users_permissions
                .roles
                .insert(UserId::new(row.user_id), roles);
        }

        debug!(
            org_id = %org_id,
            action_prefix,
            users = users_permissions.roles.len(),
            "loaded users permissions"
        );

        Ok(users_permissions)
    }
}
