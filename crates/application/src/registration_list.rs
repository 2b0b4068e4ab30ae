use std::sync::{Mutex, MutexGuard};

use warden_core::{AppError, AppResult};
use warden_domain::RoleRegistration;

/// Append-only list of fixed-role registrations shared by feature modules.
#[derive(Debug, Default)]
pub struct RegistrationList {
    registrations: Mutex<Vec<RoleRegistration>>,
}

impl RegistrationList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends registrations in order.
    pub fn append(&self, registrations: Vec<RoleRegistration>) -> AppResult<()> {
        self.lock()?.extend(registrations);
        Ok(())
    }

    /// Returns a copy of every registration for iteration outside the lock.
    pub fn snapshot(&self) -> AppResult<Vec<RoleRegistration>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Vec<RoleRegistration>>> {
        self.registrations
            .lock()
            .map_err(|_| AppError::Internal("role registration list lock poisoned".to_owned()))
    }
}
