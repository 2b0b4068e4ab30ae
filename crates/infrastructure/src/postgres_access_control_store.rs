use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use warden_application::{AccessControlStore, GetUserPermissionsQuery, UsersPermissions};
use warden_core::{AppError, AppResult, OrgId, UserId};
use warden_domain::Permission;

mod deletion;
mod user_permissions;
mod users_permissions;


/// PostgreSQL-backed store for roles, grants and assignments.
///
/// Every operation runs inside one transaction. Dropping an in-flight future
/// drops its transaction, which rolls it back.
#[derive(Clone)]
pub struct PostgresAccessControlStore {
    pool: PgPool,
}

impl PostgresAccessControlStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Store(format!("failed to begin transaction: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    action: String,
    scope: String,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission::new(row.action, row.scope)
    }
}

async fn commit(transaction: Transaction<'static, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Store(format!("failed to commit transaction: {error}")))
}

#[async_trait]
impl AccessControlStore for PostgresAccessControlStore {
    async fn get_user_permissions(
        &self,
        query: GetUserPermissionsQuery,
    ) -> AppResult<Vec<Permission>> {
        self.get_user_permissions_impl(query).await
    }

    async fn get_users_permissions(
        &self,
        org_id: OrgId,
        action_prefix: &str,
    ) -> AppResult<UsersPermissions> {
        self.get_users_permissions_impl(org_id, action_prefix).await
    }

    async fn delete_user_permissions(&self, org_id: OrgId, user_id: UserId) -> AppResult<()> {
        self.delete_user_permissions_impl(org_id, user_id).await
    }
}
