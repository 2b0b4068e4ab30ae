use std::collections::BTreeMap;

use async_trait::async_trait;
use warden_core::{AppResult, OrgId, TeamId, UserId};
use warden_domain::{BasicRole, Permission};

/// Identity and filters for a single-principal permission lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetUserPermissionsQuery {
    /// Organization the lookup is scoped to, unioned with the global scope.
    pub org_id: OrgId,
    /// Principal whose direct role assignments are followed.
    pub user_id: UserId,
    /// Teams the principal belongs to.
    pub team_ids: Vec<TeamId>,
    /// Builtin roles the principal holds (org role, plus `Grafana Admin` when flagged).
    pub roles: Vec<BasicRole>,
    /// Exact action allow-list, empty for every action.
    pub actions: Vec<String>,
}

impl GetUserPermissionsQuery {
    /// Returns whether the query names no identity to resolve.
    #[must_use]
    pub fn has_no_identity(&self) -> bool {
        self.user_id.is_anonymous() && self.team_ids.is_empty() && self.roles.is_empty()
    }

    /// Returns whether the action passes the allow-list.
    #[must_use]
    pub fn allows_action(&self, action: &str) -> bool {
        self.actions.is_empty() || self.actions.iter().any(|allowed| allowed == action)
    }
}

/// Stored permissions and basic roles of every user reachable in an organization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsersPermissions {
    /// Stored permissions per user.
    pub permissions: BTreeMap<UserId, Vec<Permission>>,
    /// Basic roles per user: org role, then `Grafana Admin` when flagged.
    pub roles: BTreeMap<UserId, Vec<BasicRole>>,
}

/// Repository port for persisted roles, grants and assignments.
#[async_trait]
pub trait AccessControlStore: Send + Sync {
    /// Returns permissions reachable through direct, team, org-role and global-admin grants.
    ///
    /// Duplicates reachable through several roles are kept.
    async fn get_user_permissions(
        &self,
        query: GetUserPermissionsQuery,
    ) -> AppResult<Vec<Permission>>;

    /// Returns stored permissions whose action starts with `action_prefix` for every user.
    async fn get_users_permissions(
        &self,
        org_id: OrgId,
        action_prefix: &str,
    ) -> AppResult<UsersPermissions>;

    /// Removes a user's role assignments and managed role in one transaction.
    async fn delete_user_permissions(&self, org_id: OrgId, user_id: UserId) -> AppResult<()>;
}
