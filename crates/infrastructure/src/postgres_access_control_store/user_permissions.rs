use tracing::debug;
use warden_core::GLOBAL_ORG_ID;
use warden_domain::BasicRole;

use super::*;

impl PostgresAccessControlStore {
    pub(super) async fn get_user_permissions_impl(
        &self,
        query: GetUserPermissionsQuery,
    ) -> AppResult<Vec<Permission>> {
        if query.has_no_identity() {
            return Ok(Vec::new());
        }

        let team_ids: Vec<i64> = query.team_ids.iter().map(|team| team.value()).collect();
        let org_roles: Vec<String> = query
            .roles
            .iter()
            .filter(|role| **role != BasicRole::GrafanaAdmin)
            .map(|role| role.as_str().to_owned())
            .collect();
        let is_grafana_admin = query.roles.contains(&BasicRole::GrafanaAdmin);

        let mut transaction = self.begin().await?;
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT permissions.action, permissions.scope
            FROM rbac_permissions AS permissions
            INNER JOIN (
                SELECT user_roles.role_id
                FROM rbac_user_roles AS user_roles
                WHERE user_roles.user_id = $2
                    AND user_roles.org_id IN ($1, $7)
                UNION
                SELECT team_roles.role_id
                FROM rbac_team_roles AS team_roles
                WHERE team_roles.team_id = ANY($3)
                    AND team_roles.org_id IN ($1, $7)
                UNION
                SELECT builtin_roles.role_id
                FROM rbac_builtin_roles AS builtin_roles
                WHERE builtin_roles.role = ANY($4)
                    AND builtin_roles.org_id IN ($1, $7)
                UNION
                SELECT builtin_roles.role_id
                FROM rbac_builtin_roles AS builtin_roles
                WHERE $5
                    AND builtin_roles.role = $8
                    AND builtin_roles.org_id = $7
            ) AS granted_roles
                ON granted_roles.role_id = permissions.role_id
            WHERE cardinality($6::text[]) = 0
                OR permissions.action = ANY($6)
            "#,
        )
        .bind(query.org_id.value())
        .bind(query.user_id.value())
        .bind(team_ids)
        .bind(org_roles)
        .bind(is_grafana_admin)
        .bind(query.actions)
        .bind(GLOBAL_ORG_ID.value())
        .bind(BasicRole::GrafanaAdmin.as_str())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to load user permissions: {error}")))?;

        commit(transaction).await?;

        debug!(
            org_id = %query.org_id,
            user_id = %query.user_id,
            count = rows.len(),
            "loaded stored user permissions"
        );

        Ok(rows.into_iter().map(Permission::from).collect())
    }
}
