use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_core::{AppError, GLOBAL_ORG_ID, OrgId, RegistrationError, TeamId, UserId};

use crate::Permission;

/// Reserved prefix of code-declared fixed roles.
pub const FIXED_ROLE_PREFIX: &str = "fixed:";
/// Reserved prefix of the in-memory basic roles.
pub const BASIC_ROLE_PREFIX: &str = "basic:";
/// Reserved prefix of persisted per-user and per-team roles.
pub const MANAGED_ROLE_PREFIX: &str = "managed:";

/// Builtin roles, ordered from most junior to most senior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BasicRole {
    /// Organization viewer.
    Viewer,
    /// Organization editor.
    Editor,
    /// Organization administrator.
    Admin,
    /// Server-wide administrator.
    #[serde(rename = "Grafana Admin")]
    GrafanaAdmin,
}

impl BasicRole {
    /// Returns every builtin role in seniority order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[BasicRole] = &[
            BasicRole::Viewer,
            BasicRole::Editor,
            BasicRole::Admin,
            BasicRole::GrafanaAdmin,
        ];

        ALL
    }

    /// Returns the stable display and storage name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::Editor => "Editor",
            Self::Admin => "Admin",
            Self::GrafanaAdmin => "Grafana Admin",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
            Self::GrafanaAdmin => "grafana_admin",
        }
    }

    /// Returns the name of the in-memory role holding this builtin role's permissions.
    #[must_use]
    pub fn role_name(&self) -> String {
        format!("{BASIC_ROLE_PREFIX}{}", self.slug())
    }

    /// Returns the stable uid of the in-memory role.
    #[must_use]
    pub fn role_uid(&self) -> String {
        format!("basic_{}", self.slug())
    }

    /// Returns this role and every role senior to it.
    pub fn with_seniors(self) -> impl Iterator<Item = Self> {
        Self::all().iter().copied().filter(move |role| *role >= self)
    }
}

impl Display for BasicRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for BasicRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Viewer" => Ok(Self::Viewer),
            "Editor" => Ok(Self::Editor),
            "Admin" => Ok(Self::Admin),
            "Grafana Admin" => Ok(Self::GrafanaAdmin),
            _ => Err(AppError::Validation(format!(
                "unknown builtin role '{value}'"
            ))),
        }
    }
}

/// Expands grants so every role senior to a granted role is reached too.
#[must_use]
pub fn expand_grants(grants: &[BasicRole]) -> BTreeSet<BasicRole> {
    grants
        .iter()
        .flat_map(|grant| grant.with_seniors())
        .collect()
}

/// Role a user holds inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrgRole {
    /// Organization viewer.
    Viewer,
    /// Organization editor.
    Editor,
    /// Organization administrator.
    Admin,
}

impl OrgRole {
    /// Returns the builtin role backing this organization role.
    #[must_use]
    pub fn as_basic_role(&self) -> BasicRole {
        match self {
            Self::Viewer => BasicRole::Viewer,
            Self::Editor => BasicRole::Editor,
            Self::Admin => BasicRole::Admin,
        }
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.as_basic_role().as_str()
    }
}

impl FromStr for OrgRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match BasicRole::from_str(value)? {
            BasicRole::Viewer => Ok(Self::Viewer),
            BasicRole::Editor => Ok(Self::Editor),
            BasicRole::Admin => Ok(Self::Admin),
            BasicRole::GrafanaAdmin => Err(AppError::Validation(format!(
                "'{value}' is not an organization role"
            ))),
        }
    }
}

/// Role definition with its ordered permission list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleDto {
    /// Stable role uid.
    pub uid: String,
    /// Role name. Fixed roles carry [`FIXED_ROLE_PREFIX`].
    pub name: String,
    /// Declaration version.
    pub version: i64,
    /// Owning organization, [`GLOBAL_ORG_ID`] for organization-agnostic roles.
    pub org_id: OrgId,
    /// Granted permissions, duplicates allowed.
    pub permissions: Vec<Permission>,
}

impl RoleDto {
    /// Creates a global role without permissions.
    #[must_use]
    pub fn global(uid: impl Into<String>, name: impl Into<String>, version: i64) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            version,
            org_id: GLOBAL_ORG_ID,
            permissions: Vec::new(),
        }
    }

    /// Replaces the permission list.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Returns whether the role is organization-agnostic.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.org_id.is_global()
    }

    /// Returns whether the role applies inside the organization.
    #[must_use]
    pub fn applies_to(&self, org_id: OrgId) -> bool {
        self.is_global() || self.org_id == org_id
    }

    /// Returns whether the name carries the fixed-role prefix.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.name.starts_with(FIXED_ROLE_PREFIX)
    }
}

/// Fixed role declared by a feature module, with the builtin roles it is granted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistration {
    /// Declared role.
    pub role: RoleDto,
    /// Builtin role names the permissions attach to.
    pub grants: Vec<String>,
}

impl RoleRegistration {
    /// Creates a registration.
    #[must_use]
    pub fn new<I, S>(role: RoleDto, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role,
            grants: grants.into_iter().map(Into::into).collect(),
        }
    }

    /// Validates the role name and parses the grants.
    pub fn validate(&self) -> Result<Vec<BasicRole>, RegistrationError> {
        if !self.role.is_fixed() {
            return Err(RegistrationError::FixedRolePrefixMissing {
                role: self.role.name.clone(),
            });
        }

        self.grants
            .iter()
            .map(|grant| {
                BasicRole::from_str(grant).map_err(|_| RegistrationError::InvalidBuiltinRole {
                    role: self.role.name.clone(),
                    grant: grant.clone(),
                })
            })
            .collect()
    }
}

/// Returns the reserved name of the managed role holding a user's direct grants.
#[must_use]
pub fn managed_user_role_name(user_id: UserId) -> String {
    format!("{MANAGED_ROLE_PREFIX}users:{user_id}:permissions")
}

/// Returns the reserved name of the managed role holding a team's direct grants.
#[must_use]
pub fn managed_team_role_name(team_id: TeamId) -> String {
    format!("{MANAGED_ROLE_PREFIX}teams:{team_id}:permissions")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;
    use warden_core::{RegistrationError, TeamId, UserId};

    use super::{
        BASIC_ROLE_PREFIX, BasicRole, OrgRole, RoleDto, RoleRegistration, expand_grants,
        managed_team_role_name, managed_user_role_name,
    };

    fn basic_role() -> impl Strategy<Value = BasicRole> {
        prop::sample::select(BasicRole::all().to_vec())
    }

    #[test]
    fn basic_role_roundtrip_storage_value() {
        for role in BasicRole::all() {
            let restored = BasicRole::from_str(role.as_str());
            assert_eq!(restored.ok(), Some(*role));
        }
        assert!(BasicRole::from_str("WrongAdmin").is_err());
    }

    #[test]
    fn basic_role_names_share_the_reserved_prefix() {
        for role in BasicRole::all() {
            assert!(role.role_name().starts_with(BASIC_ROLE_PREFIX));
        }
        assert_eq!(BasicRole::GrafanaAdmin.role_name(), "basic:grafana_admin");
        assert_eq!(BasicRole::Viewer.role_uid(), "basic_viewer");
    }

    #[test]
    fn seniority_order_is_viewer_editor_admin_grafana_admin() {
        assert!(BasicRole::Viewer < BasicRole::Editor);
        assert!(BasicRole::Editor < BasicRole::Admin);
        assert!(BasicRole::Admin < BasicRole::GrafanaAdmin);
    }

    #[test]
    fn admin_grant_reaches_grafana_admin_only() {
        let expanded = expand_grants(&[BasicRole::Admin]);
        assert_eq!(
            expanded.into_iter().collect::<Vec<_>>(),
            vec![BasicRole::Admin, BasicRole::GrafanaAdmin]
        );
    }

    #[test]
    fn grafana_admin_is_not_an_org_role() {
        assert!(OrgRole::from_str("Grafana Admin").is_err());
        assert_eq!(OrgRole::from_str("Editor").ok(), Some(OrgRole::Editor));
    }

    #[test]
    fn registration_requires_fixed_prefix() {
        let registration =
            RoleRegistration::new(RoleDto::global("", "custom:test:test", 1), ["Admin"]);
        assert!(matches!(
            registration.validate(),
            Err(RegistrationError::FixedRolePrefixMissing { .. })
        ));
    }

    #[test]
    fn registration_rejects_unknown_grant() {
        let registration =
            RoleRegistration::new(RoleDto::global("", "fixed:test:test", 1), ["WrongAdmin"]);
        assert_eq!(
            registration.validate(),
            Err(RegistrationError::InvalidBuiltinRole {
                role: "fixed:test:test".to_owned(),
                grant: "WrongAdmin".to_owned(),
            })
        );
    }

    #[test]
    fn managed_role_names_encode_the_owner() {
        assert_eq!(
            managed_user_role_name(UserId::new(3)),
            "managed:users:3:permissions"
        );
        assert_eq!(
            managed_team_role_name(TeamId::new(9)),
            "managed:teams:9:permissions"
        );
    }

    proptest! {
        #[test]
        fn expansion_reaches_seniors_and_never_juniors(
            grants in prop::collection::vec(basic_role(), 0..4)
        ) {
            let expanded = expand_grants(&grants);
            for role in BasicRole::all() {
                let reached = grants.iter().any(|grant| grant <= role);
                prop_assert_eq!(expanded.contains(role), reached);
            }
        }
    }
}
