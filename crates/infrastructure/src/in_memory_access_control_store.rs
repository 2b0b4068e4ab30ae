use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;
use warden_application::{AccessControlStore, GetUserPermissionsQuery, UsersPermissions};
use warden_core::{AppError, AppResult, GLOBAL_ORG_ID, OrgId, TeamId, UserId};
use warden_domain::{BasicRole, OrgRole, Permission, RoleDto, managed_user_role_name, scope};


type RoleId = i64;
type Assignments = BTreeSet<(OrgId, RoleId)>;

#[derive(Debug, Default)]
struct AccessControlTables {
    next_role_id: RoleId,
    roles: BTreeMap<RoleId, RoleDto>,
    user_roles: BTreeMap<UserId, Assignments>,
    team_roles: BTreeMap<TeamId, Assignments>,
    builtin_roles: BTreeMap<BasicRole, Assignments>,
    team_members: BTreeMap<TeamId, BTreeSet<UserId>>,
    org_users: BTreeMap<OrgId, BTreeMap<UserId, OrgRole>>,
    admins: BTreeSet<UserId>,
}

impl AccessControlTables {
    fn permissions(&self, role_id: RoleId) -> &[Permission] {
        self.roles
            .get(&role_id)
            .map(|role| role.permissions.as_slice())
            .unwrap_or_default()
    }

    fn require_role(&self, role_id: RoleId) -> AppResult<()> {
        if self.roles.contains_key(&role_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("role '{role_id}' was not found")))
        }
    }
}

fn in_scope(assigned: OrgId, org_id: OrgId) -> bool {
    assigned == org_id || assigned.is_global()
}

/// In-memory store keeping one index per grant path.
#[derive(Debug, Default)]
pub struct InMemoryAccessControlStore {
    tables: RwLock<AccessControlTables>,
}

impl InMemoryAccessControlStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a user and its server-wide administrator flag.
    pub async fn insert_user(&self, user_id: UserId, is_admin: bool) {
        let mut tables = self.tables.write().await;
        if is_admin {
            tables.admins.insert(user_id);
        } else {
            tables.admins.remove(&user_id);
        }
    }

    /// Sets a user's role inside an organization.
    pub async fn set_org_role(&self, org_id: OrgId, user_id: UserId, role: OrgRole) {
        self.tables
            .write()
            .await
            .org_users
            .entry(org_id)
            .or_default()
            .insert(user_id, role);
    }

    /// Adds a user to a team.
    pub async fn add_team_member(&self, team_id: TeamId, user_id: UserId) {
        self.tables
            .write()
            .await
            .team_members
            .entry(team_id)
            .or_default()
            .insert(user_id);
    }

    /// Persists a role with its permissions and returns its id.
    ///
    /// A missing uid is generated.
    pub async fn create_role(&self, mut role: RoleDto) -> AppResult<RoleId> {
        let mut tables = self.tables.write().await;
        if tables
            .roles
            .values()
            .any(|stored| stored.org_id == role.org_id && stored.name == role.name)
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists in org '{}'",
                role.name, role.org_id
            )));
        }

        if role.uid.is_empty() {
            role.uid = Uuid::new_v4().simple().to_string();
        }

        tables.next_role_id += 1;
        let role_id = tables.next_role_id;
        tables.roles.insert(role_id, role);
        Ok(role_id)
    }

    /// Appends permissions to a stored role.
    pub async fn add_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let role = tables
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        role.permissions.extend(permissions);
        Ok(())
    }

    /// Assigns a stored role to a user.
    pub async fn assign_user_role(
        &self,
        org_id: OrgId,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_role(role_id)?;
        tables
            .user_roles
            .entry(user_id)
            .or_default()
            .insert((org_id, role_id));
        Ok(())
    }

    /// Assigns a stored role to a team.
    pub async fn assign_team_role(
        &self,
        org_id: OrgId,
        team_id: TeamId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_role(role_id)?;
        tables
            .team_roles
            .entry(team_id)
            .or_default()
            .insert((org_id, role_id));
        Ok(())
    }

    /// Links a stored role to a builtin role.
    pub async fn assign_builtin_role(
        &self,
        org_id: OrgId,
        builtin_role: BasicRole,
        role_id: RoleId,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_role(role_id)?;
        tables
            .builtin_roles
            .entry(builtin_role)
            .or_default()
            .insert((org_id, role_id));
        Ok(())
    }

    /// Finds a stored role by name inside an organization.
    pub async fn find_role(&self, org_id: OrgId, name: &str) -> Option<RoleDto> {
        self.tables
            .read()
            .await
            .roles
            .values()
            .find(|role| role.org_id == org_id && role.name == name)
            .cloned()
    }
}

#[async_trait]
impl AccessControlStore for InMemoryAccessControlStore {
    async fn get_user_permissions(
        &self,
        query: GetUserPermissionsQuery,
    ) -> AppResult<Vec<Permission>> {
        if query.has_no_identity() {
            return Ok(Vec::new());
        }

        let tables = self.tables.read().await;
        let scoped = |assignments: Option<&Assignments>| {
            assignments
                .into_iter()
                .flatten()
                .filter(|(assigned, _)| in_scope(*assigned, query.org_id))
                .map(|(_, role_id)| *role_id)
                .collect::<Vec<_>>()
        };

        let mut role_ids = BTreeSet::new();
        role_ids.extend(scoped(tables.user_roles.get(&query.user_id)));
        for team_id in &query.team_ids {
            role_ids.extend(scoped(tables.team_roles.get(team_id)));
        }
        for role in query
            .roles
            .iter()
            .filter(|role| **role != BasicRole::GrafanaAdmin)
        {
            role_ids.extend(scoped(tables.builtin_roles.get(role)));
        }
        if query.roles.contains(&BasicRole::GrafanaAdmin) {
            role_ids.extend(
                tables
                    .builtin_roles
                    .get(&BasicRole::GrafanaAdmin)
                    .into_iter()
                    .flatten()
                    .filter(|(assigned, _)| assigned.is_global())
                    .map(|(_, role_id)| *role_id),
            );
        }

        Ok(role_ids
            .into_iter()
            .flat_map(|role_id| tables.permissions(role_id).iter())
            .filter(|permission| query.allows_action(permission.action()))
            .cloned()
            .collect())
    }

    async fn get_users_permissions(
        &self,
        org_id: OrgId,
        action_prefix: &str,
    ) -> AppResult<UsersPermissions> {
        let tables = self.tables.read().await;
        let mut rows: BTreeSet<(UserId, OrgId, &Permission)> = BTreeSet::new();
        let mut collect = |user_id: UserId, assigned: OrgId, role_id: RoleId| {
            for permission in tables.permissions(role_id) {
                if permission.has_action_prefix(action_prefix) {
                    rows.insert((user_id, assigned, permission));
                }
            }
        };

        for (user_id, assignments) in &tables.user_roles {
            for (assigned, role_id) in assignments {
                if in_scope(*assigned, org_id) {
                    collect(*user_id, *assigned, *role_id);
                }
            }
        }

        for (team_id, assignments) in &tables.team_roles {
            let members = tables.team_members.get(team_id).into_iter().flatten();
            for user_id in members {
                for (assigned, role_id) in assignments {
                    if in_scope(*assigned, org_id) {
                        collect(*user_id, *assigned, *role_id);
                    }
                }
            }
        }

        let org_members = tables.org_users.get(&org_id);
        for (user_id, org_role) in org_members.into_iter().flatten() {
            let linked = tables.builtin_roles.get(&org_role.as_basic_role());
            for (assigned, role_id) in linked.into_iter().flatten() {
                if in_scope(*assigned, org_id) {
                    collect(*user_id, *assigned, *role_id);
                }
            }
        }

        let admin_links = tables.builtin_roles.get(&BasicRole::GrafanaAdmin);
        for user_id in &tables.admins {
            for (assigned, role_id) in admin_links.into_iter().flatten() {
                if *assigned == GLOBAL_ORG_ID {
                    collect(*user_id, *assigned, *role_id);
                }
            }
        }

        let mut users_permissions = UsersPermissions::default();
        for (user_id, _, permission) in rows {
            users_permissions
                .permissions
                .entry(user_id)
                .or_default()
                .push(permission.clone());
        }

        for (user_id, org_role) in org_members.into_iter().flatten() {
            users_permissions
                .roles
                .insert(*user_id, vec![org_role.as_basic_role()]);
        }
        for user_id in &tables.admins {
            users_permissions
                .roles
                .entry(*user_id)
                .or_default()
                .push(BasicRole::GrafanaAdmin);
        }

        Ok(users_permissions)
    }

    async fn delete_user_permissions(&self, org_id: OrgId, user_id: UserId) -> AppResult<()> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        if org_id.is_global() {
            tables.user_roles.remove(&user_id);

            let user_scope = scope(&["users", "id", user_id.to_string().as_str()]);
            for role in tables.roles.values_mut() {
                role.permissions
                    .retain(|permission| permission.scope() != user_scope);
            }
        } else if let Some(assignments) = tables.user_roles.get_mut(&user_id) {
            assignments.retain(|(assigned, _)| *assigned != org_id);
        }

        let managed_role_name = managed_user_role_name(user_id);
        let managed_role_ids: Vec<RoleId> = tables
            .roles
            .iter()
            .filter(|(_, role)| {
                role.name == managed_role_name && (org_id.is_global() || role.org_id == org_id)
            })
            .map(|(role_id, _)| *role_id)
            .collect();

        if managed_role_ids.is_empty() {
            return Ok(());
        }

        for role_id in &managed_role_ids {
            tables.roles.remove(role_id);
        }
        let assignments = tables
            .user_roles
            .values_mut()
            .chain(tables.team_roles.values_mut())
            .chain(tables.builtin_roles.values_mut());
        for assigned in assignments {
            assigned.retain(|(_, role_id)| !managed_role_ids.contains(role_id));
        }

        info!(
            org_id = %org_id,
            user_id = %user_id,
            managed_roles = managed_role_ids.len(),
            "deleted managed user permissions"
        );

        Ok(())
    }
}
