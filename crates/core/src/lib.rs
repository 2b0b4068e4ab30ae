//! Shared primitives for all Rust crates in Warden.

#![forbid(unsafe_code)]

/// Identifier newtypes shared across services.
pub mod ids;

use thiserror::Error;

pub use ids::{GLOBAL_ORG_ID, OrgId, TeamId, UserId};

/// Result type used across Warden crates.
pub type AppResult<T> = Result<T, AppError>;

/// Reasons a fixed-role registration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Fixed role names must carry the reserved fixed-role prefix.
    #[error("fixed role '{role}' is missing the 'fixed:' prefix")]
    FixedRolePrefixMissing {
        /// Offending role name.
        role: String,
    },

    /// A grant names something other than a recognized builtin role.
    #[error("fixed role '{role}' grants unknown builtin role '{grant}'")]
    InvalidBuiltinRole {
        /// Role whose grants were rejected.
        role: String,
        /// Unrecognized grant target.
        grant: String,
    },
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A fixed-role declaration batch was rejected.
    #[error("invalid registration: {0}")]
    InvalidRegistration(#[from] RegistrationError),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence layer failure, propagated without retry.
    #[error("store error: {0}")]
    Store(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the registration failure carried by this error, if any.
    #[must_use]
    pub fn as_registration_error(&self) -> Option<&RegistrationError> {
        match self {
            Self::InvalidRegistration(error) => Some(error),
            _ => None,
        }
    }
}
