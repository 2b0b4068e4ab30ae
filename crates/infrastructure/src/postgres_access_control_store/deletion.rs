use tracing::info;
use warden_domain::{managed_user_role_name, scope};

use super::*;

const UNLINK_MANAGED_ROLE: [&str; 3] = [
    "DELETE FROM rbac_user_roles WHERE role_id = ANY($1)",
    "DELETE FROM rbac_team_roles WHERE role_id = ANY($1)",
    "DELETE FROM rbac_builtin_roles WHERE role_id = ANY($1)",
];

impl PostgresAccessControlStore {
    pub(super) async fn delete_user_permissions_impl(
        &self,
        org_id: OrgId,
        user_id: UserId,
    ) -> AppResult<()> {
        let mut transaction = self.begin().await?;

        let assignment_delete = if org_id.is_global() {
            sqlx::query("DELETE FROM rbac_user_roles WHERE user_id = $1").bind(user_id.value())
        } else {
            sqlx::query("DELETE FROM rbac_user_roles WHERE user_id = $1 AND org_id = $2")
                .bind(user_id.value())
                .bind(org_id.value())
        };
        assignment_delete
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Store(format!("failed to delete user role assignments: {error}"))
            })?;

        // Grants scoped to the user only go away once the user loses all access.
        if org_id.is_global() {
            let user_scope = scope(&["users", "id", user_id.to_string().as_str()]);
            sqlx::query("DELETE FROM rbac_permissions WHERE scope = $1")
                .bind(user_scope)
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Store(format!("failed to delete user scoped permissions: {error}"))
                })?;
        }

        let managed_role_name = managed_user_role_name(user_id);
        let role_lookup = if org_id.is_global() {
            sqlx::query_scalar::<_, i64>("SELECT id FROM rbac_roles WHERE name = $1")
                .bind(managed_role_name.as_str())
        } else {
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM rbac_roles WHERE name = $1 AND org_id = $2",
            )
            .bind(managed_role_name.as_str())
            .bind(org_id.value())
        };
        let role_ids = role_lookup
            .fetch_all(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Store(format!("failed to resolve managed user role: {error}"))
            })?;

        if role_ids.is_empty() {
            commit(transaction).await?;
            return Ok(());
        }

        sqlx::query("DELETE FROM rbac_permissions WHERE role_id = ANY($1)")
            .bind(role_ids.as_slice())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Store(format!("failed to delete managed user permissions: {error}"))
            })?;

        for unlink in UNLINK_MANAGED_ROLE {
            sqlx::query(unlink)
                .bind(role_ids.as_slice())
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Store(format!("failed to unlink managed user role: {error}"))
                })?;
        }

        sqlx::query("DELETE FROM rbac_roles WHERE id = ANY($1)")
            .bind(role_ids.as_slice())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Store(format!("failed to delete managed user role: {error}"))
            })?;

        commit(transaction).await?;

        info!(
            org_id = %org_id,
            user_id = %user_id,
            managed_roles = role_ids.len(),
            "deleted managed user permissions"
        );

        Ok(())
    }
}
