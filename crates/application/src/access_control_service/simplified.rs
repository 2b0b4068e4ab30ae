use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use warden_domain::{
    Permission, SimplifiedUserPermission, actions, is_wildcard_for, resource_of, scope_identifier,
    scopes,
};

use crate::{Requester, UsersPermissions};

use super::*;

/// Simplified permission summary per target user.
pub type SimplifiedUsersPermissions = BTreeMap<UserId, Vec<SimplifiedUserPermission>>;

/// Users whose permissions the requester may read.
#[derive(Debug, PartialEq, Eq)]
enum UserVisibility {
    All,
    Only(BTreeSet<UserId>),
}

impl UserVisibility {
    fn from_scopes(granted: &[String]) -> Self {
        let mut visible = BTreeSet::new();
        for scope in granted {
            if !scope.is_empty() && is_wildcard_for(scope, "users") {
                return Self::All;
            }
            if let Some(id) = scope
                .strip_prefix(scopes::USERS_ID_PREFIX)
                .and_then(|value| value.parse::<i64>().ok())
            {
                visible.insert(UserId::new(id));
            }
        }
        Self::Only(visible)
    }

    fn contains(&self, user_id: UserId) -> bool {
        match self {
            Self::All => true,
            Self::Only(visible) => visible.contains(&user_id),
        }
    }
}

impl AccessControlService {
    /// Summarizes what every visible user of the organization may do within one
    /// action family.
    ///
    /// Users the requester may not read are left out, as are users holding
    /// nothing under `action_prefix`.
    pub async fn get_simplified_users_permissions(
        &self,
        requester: &Requester,
        org_id: OrgId,
        action_prefix: &str,
    ) -> AppResult<SimplifiedUsersPermissions> {
        let visibility =
            UserVisibility::from_scopes(requester.scopes(org_id, actions::USERS_PERMISSIONS_READ));
        if visibility == UserVisibility::Only(BTreeSet::new()) {
            return Ok(SimplifiedUsersPermissions::new());
        }

        let basic_permissions = self.roles.permissions_with_prefix(action_prefix);
        let UsersPermissions {
            permissions: mut stored_permissions,
            roles: mut stored_roles,
        } = self
            .store
            .get_users_permissions(org_id, action_prefix)
            .await?;

        let user_ids: BTreeSet<UserId> = stored_permissions
            .keys()
            .chain(stored_roles.keys())
            .copied()
            .collect();

        let resource = resource_of(action_prefix);
        let mut summary = SimplifiedUsersPermissions::new();
        let mut hidden = 0_usize;

        for user_id in user_ids {
            if !visibility.contains(user_id) {
                hidden += 1;
                continue;
            }

            let mut merged = stored_permissions.remove(&user_id).unwrap_or_default();
            for role in stored_roles.remove(&user_id).unwrap_or_default() {
                merged.extend(
                    basic_permissions
                        .get(&role)
                        .map(Vec::as_slice)
                        .unwrap_or_default()
                        .iter()
                        .cloned(),
                );
            }

            let simplified = simplify(&merged, resource);
            if !simplified.is_empty() {
                summary.insert(user_id, simplified);
            }
        }

        debug!(
            org_id = %org_id,
            action_prefix,
            users = summary.len(),
            hidden,
            "built simplified users permissions"
        );

        Ok(summary)
    }
}

/// Collapses permissions into one entry per action: `all` when any scope covers
/// the whole resource type, the set of instance identifiers otherwise.
fn simplify(permissions: &[Permission], resource: &str) -> Vec<SimplifiedUserPermission> {
    let mut grouped: BTreeMap<&str, (bool, BTreeSet<String>)> = BTreeMap::new();

    for permission in permissions {
        let (all, uids) = grouped.entry(permission.action()).or_default();
        if is_wildcard_for(permission.scope(), resource) {
            *all = true;
        } else if let Some(uid) = scope_identifier(permission.scope()) {
            uids.insert(uid.to_owned());
        }
    }

    grouped
        .into_iter()
        .filter_map(|(action, (all, uids))| {
            if all {
                Some(SimplifiedUserPermission::all(action))
            } else if uids.is_empty() {
                None
            } else {
                Some(SimplifiedUserPermission::with_uids(action, uids))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use warden_core::UserId;
    use warden_domain::{Permission, SimplifiedUserPermission};

    use super::{UserVisibility, simplify};

    #[test]
    fn wildcard_wins_over_instance_scopes() {
        let simplified = simplify(
            &[
                Permission::new("teams:read", "teams:id:1"),
                Permission::new("teams:read", "teams:*"),
                Permission::new("teams:write", "teams:id:1"),
                Permission::new("teams:write", "teams:id:2"),
                Permission::new("teams:write", "teams:id:1"),
            ],
            "teams",
        );

        assert_eq!(
            simplified,
            vec![
                SimplifiedUserPermission::all("teams:read"),
                SimplifiedUserPermission::with_uids("teams:write", ["1", "2"]),
            ]
        );
    }

    #[test]
    fn foreign_resource_wildcards_are_not_all() {
        let simplified = simplify(&[Permission::new("teams:read", "folders:*")], "teams");
        assert!(simplified.is_empty());
    }

    #[test]
    fn visibility_parses_user_instance_scopes() {
        let visibility =
            UserVisibility::from_scopes(&["users:id:2".to_owned(), "users:id:x".to_owned()]);
        assert!(visibility.contains(UserId::new(2)));
        assert!(!visibility.contains(UserId::new(1)));

        let everyone = UserVisibility::from_scopes(&["users:*".to_owned()]);
        assert_eq!(everyone, UserVisibility::All);
    }
}
