use tracing::debug;
use warden_domain::{Permission, scope_matches};

use crate::{GetUserPermissionsQuery, Requester, group_scopes_by_action};

use super::*;

impl AccessControlService {
    /// Returns every permission the principal holds in its organization.
    ///
    /// Builtin role permissions come first, stored grants follow. An empty
    /// `actions` list means no action filter.
    pub async fn get_user_permissions(
        &self,
        requester: &Requester,
        actions: &[&str],
    ) -> AppResult<Vec<Permission>> {
        let roles = requester.basic_roles();
        let mut permissions: Vec<Permission> = self
            .roles
            .permissions_for(&roles, requester.org_id)
            .into_iter()
            .filter(|permission| {
                actions.is_empty() || actions.iter().any(|action| *action == permission.action())
            })
            .collect();

        let stored = self
            .store
            .get_user_permissions(GetUserPermissionsQuery {
                org_id: requester.org_id,
                user_id: requester.user_id,
                team_ids: requester.team_ids.clone(),
                roles,
                actions: actions.iter().map(|action| (*action).to_owned()).collect(),
            })
            .await?;

        debug!(
            org_id = %requester.org_id,
            user_id = %requester.user_id,
            builtin = permissions.len(),
            stored = stored.len(),
            "resolved user permissions"
        );

        permissions.extend(stored);
        Ok(permissions)
    }

    /// Resolves the principal's permissions and caches them on the requester.
    pub async fn load_requester_permissions(&self, requester: &mut Requester) -> AppResult<()> {
        let permissions = self.get_user_permissions(requester, &[]).await?;
        requester
            .permissions
            .insert(requester.org_id, group_scopes_by_action(&permissions));
        Ok(())
    }

    /// Returns whether the principal may perform the action, optionally on a scope.
    ///
    /// Cached permissions on the requester are used when present.
    pub async fn has_permission(
        &self,
        requester: &Requester,
        action: &str,
        scope: Option<&str>,
    ) -> AppResult<bool> {
        let granted_scopes: Vec<String> = match requester.permissions.get(&requester.org_id) {
            Some(cached) => cached.get(action).cloned().unwrap_or_default(),
            None => self
                .get_user_permissions(requester, &[action])
                .await?
                .into_iter()
                .filter(|permission| permission.action() == action)
                .map(|permission| permission.scope().to_owned())
                .collect(),
        };

        if granted_scopes.is_empty() {
            return Ok(false);
        }

        Ok(match scope {
            None => true,
            Some(target) => granted_scopes
                .iter()
                .any(|granted| scope_matches(granted, target)),
        })
    }
}
