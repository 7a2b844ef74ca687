//! Password checks for the admin and control panels, guarded by lockout.

use std::sync::Arc;

use tracing::debug;

use crate::db::DbResult;
use crate::lockout::{LockoutGuard, ADMIN_PANEL, CONTROL_PANEL};
use crate::store::StateStore;

/// Outcome of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted,
    /// Wrong password, more attempts allowed
    Denied { remaining_attempts: u32 },
    /// Context is locked; the password was not checked or just caused the lock
    LockedOut { remaining_minutes: u32 },
    /// No clinic with that id; not counted as a failure
    UnknownClinic,
}

impl AuthOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthOutcome::Granted)
    }
}

pub struct Authenticator {
    store: Arc<StateStore>,
    guard: LockoutGuard,
}

impl Authenticator {
    pub fn new(store: Arc<StateStore>, guard: LockoutGuard) -> Self {
        Self { store, guard }
    }

    pub fn guard(&self) -> &LockoutGuard {
        &self.guard
    }

    /// Check the admin password from the settings.
    pub fn authenticate_admin(&self, input: &str) -> DbResult<AuthOutcome> {
        if let Some(locked) = self.locked(ADMIN_PANEL)? {
            return Ok(locked);
        }
        let expected = self.store.read()?.settings.admin_password;
        self.settle(ADMIN_PANEL, expected == input)
    }

    /// Check a clinic's control panel password.
    pub fn authenticate_clinic(&self, clinic_id: &str, input: &str) -> DbResult<AuthOutcome> {
        if let Some(locked) = self.locked(CONTROL_PANEL)? {
            return Ok(locked);
        }
        let doc = self.store.read()?;
        let Some(clinic) = doc.clinic(clinic_id) else {
            return Ok(AuthOutcome::UnknownClinic);
        };
        self.settle(CONTROL_PANEL, clinic.password_matches(input))
    }

    fn locked(&self, context: &str) -> DbResult<Option<AuthOutcome>> {
        let status = self.guard.check_status(context)?;
        Ok(status.is_locked.then_some(AuthOutcome::LockedOut {
            remaining_minutes: status.remaining_minutes,
        }))
    }

    fn settle(&self, context: &str, matched: bool) -> DbResult<AuthOutcome> {
        if matched {
            self.guard.clear(context)?;
            debug!(context, "login granted");
            return Ok(AuthOutcome::Granted);
        }

        let failure = self.guard.register_failure(context)?;
        if failure.locked {
            let status = self.guard.check_status(context)?;
            return Ok(AuthOutcome::LockedOut {
                remaining_minutes: status.remaining_minutes,
            });
        }
        Ok(AuthOutcome::Denied {
            remaining_attempts: failure.remaining_attempts,
        })
    }
}
