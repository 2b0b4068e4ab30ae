use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Well-known actions referenced by the engine itself.
pub mod actions {
    /// Read other users' permissions.
    pub const USERS_PERMISSIONS_READ: &str = "users:permissions:read";
    /// Create users.
    pub const USERS_CREATE: &str = "users:create";
    /// Read teams.
    pub const TEAMS_READ: &str = "teams:read";
    /// Create teams.
    pub const TEAMS_CREATE: &str = "teams:create";
    /// Update teams and their members.
    pub const TEAMS_WRITE: &str = "teams:write";
    /// Read team permissions.
    pub const TEAMS_PERMISSIONS_READ: &str = "teams:permissions:read";
    /// Update team permissions.
    pub const TEAMS_PERMISSIONS_WRITE: &str = "teams:permissions:write";
}

/// Well-known scopes referenced by the engine itself.
pub mod scopes {
    /// Every user.
    pub const USERS_ALL: &str = "users:*";
    /// Prefix of a single-user instance scope.
    pub const USERS_ID_PREFIX: &str = "users:id:";
    /// Every team.
    pub const TEAMS_ALL: &str = "teams:*";
}

/// Immutable `(action, scope)` pair granted through a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Permission {
    action: String,
    scope: String,
}

impl Permission {
    /// Creates a permission for an action over a scope.
    #[must_use]
    pub fn new(action: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            scope: scope.into(),
        }
    }

    /// Creates a resource-unscoped permission.
    #[must_use]
    pub fn unscoped(action: impl Into<String>) -> Self {
        Self::new(action, "")
    }

    /// Returns the action identifier.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the scope identifier, empty when unscoped.
    #[must_use]
    pub fn scope(&self) -> &str {
        self.scope.as_str()
    }

    /// Returns whether the action starts with the given prefix.
    #[must_use]
    pub fn has_action_prefix(&self, prefix: &str) -> bool {
        self.action.starts_with(prefix)
    }
}

/// Joins scope segments with `:`.
#[must_use]
pub fn scope(parts: &[&str]) -> String {
    parts.join(":")
}

/// Returns the resource type an action or prefix belongs to.
///
/// `teams:read` and `teams` both resolve to `teams`.
#[must_use]
pub fn resource_of(action_or_prefix: &str) -> &str {
    action_or_prefix
        .split(':')
        .next()
        .unwrap_or(action_or_prefix)
}

/// Returns whether `scope` covers every instance of `resource`.
///
/// The empty scope, `*`, `<resource>:*` and `<resource>:<attribute>:*` all qualify.
#[must_use]
pub fn is_wildcard_for(scope: &str, resource: &str) -> bool {
    if scope.is_empty() || scope == "*" {
        return true;
    }

    let Some(rest) = scope
        .strip_prefix(resource)
        .and_then(|rest| rest.strip_prefix(':'))
    else {
        return false;
    };

    rest == "*" || rest.split_once(':').is_some_and(|(_, value)| value == "*")
}

/// Returns the trailing identifier of an instance scope.
///
/// `teams:id:1` yields `1`; wildcards and malformed scopes yield `None`.
#[must_use]
pub fn scope_identifier(scope: &str) -> Option<&str> {
    let mut segments = scope.splitn(3, ':');
    let _resource = segments.next().filter(|value| !value.is_empty())?;
    let _attribute = segments.next().filter(|value| !value.is_empty())?;
    segments
        .next()
        .filter(|value| !value.is_empty() && *value != "*")
}

/// Returns whether a granted scope covers the target scope.
#[must_use]
pub fn scope_matches(granted: &str, target: &str) -> bool {
    if granted == target {
        return true;
    }

    granted
        .strip_suffix('*')
        .is_some_and(|prefix| target.starts_with(prefix))
}

/// Compact per-action projection of one user's permissions.
///
/// `all` and a non-empty `uids` set are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedUserPermission {
    /// Action identifier.
    pub action: String,
    /// The user holds the action over every resource instance.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
    /// Explicit resource identifiers the action applies to.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub uids: BTreeSet<String>,
}

impl SimplifiedUserPermission {
    /// Creates an entry covering every resource instance.
    #[must_use]
    pub fn all(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            all: true,
            uids: BTreeSet::new(),
        }
    }

    /// Creates an entry restricted to explicit resource identifiers.
    #[must_use]
    pub fn with_uids<I, S>(action: impl Into<String>, uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action: action.into(),
            all: false,
            uids: uids.into_iter().map(Into::into).collect(),
        }
    }
}
