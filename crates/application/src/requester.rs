use std::collections::HashMap;

use warden_core::{OrgId, TeamId, UserId};
use warden_domain::{BasicRole, OrgRole, Permission};

/// Scopes held per action.
pub type ScopesByAction = HashMap<String, Vec<String>>;

/// Signed-in principal on whose behalf a request is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requester {
    /// Organization the principal is acting in.
    pub org_id: OrgId,
    /// Principal id.
    pub user_id: UserId,
    /// Teams the principal belongs to in `org_id`.
    pub team_ids: Vec<TeamId>,
    /// Role held in `org_id`, if any.
    pub org_role: Option<OrgRole>,
    /// Server-wide administrator flag.
    pub is_grafana_admin: bool,
    /// Resolved permissions per organization.
    pub permissions: HashMap<OrgId, ScopesByAction>,
}

impl Requester {
    /// Creates a principal without roles or resolved permissions.
    #[must_use]
    pub fn new(org_id: OrgId, user_id: UserId) -> Self {
        Self {
            org_id,
            user_id,
            ..Self::default()
        }
    }

    /// Sets the organization role.
    #[must_use]
    pub fn with_org_role(mut self, org_role: OrgRole) -> Self {
        self.org_role = Some(org_role);
        self
    }

    /// Sets the server-wide administrator flag.
    #[must_use]
    pub fn with_grafana_admin(mut self, is_grafana_admin: bool) -> Self {
        self.is_grafana_admin = is_grafana_admin;
        self
    }

    /// Sets team memberships.
    #[must_use]
    pub fn with_teams(mut self, team_ids: Vec<TeamId>) -> Self {
        self.team_ids = team_ids;
        self
    }

    /// Stores resolved permissions for an organization.
    #[must_use]
    pub fn with_permissions(mut self, org_id: OrgId, permissions: ScopesByAction) -> Self {
        self.permissions.insert(org_id, permissions);
        self
    }

    /// Returns the builtin roles held: org role first, then `Grafana Admin`.
    #[must_use]
    pub fn basic_roles(&self) -> Vec<BasicRole> {
        let mut roles: Vec<BasicRole> = self
            .org_role
            .iter()
            .map(OrgRole::as_basic_role)
            .collect();
        if self.is_grafana_admin {
            roles.push(BasicRole::GrafanaAdmin);
        }
        roles
    }

    /// Returns the scopes held for an action in an organization.
    #[must_use]
    pub fn scopes(&self, org_id: OrgId, action: &str) -> &[String] {
        self.permissions
            .get(&org_id)
            .and_then(|permissions| permissions.get(action))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Groups a flat permission list into scopes per action.
#[must_use]
pub fn group_scopes_by_action(permissions: &[Permission]) -> ScopesByAction {
    let mut grouped = ScopesByAction::new();
    for permission in permissions {
        grouped
            .entry(permission.action().to_owned())
            .or_default()
            .push(permission.scope().to_owned());
    }
    grouped
}
