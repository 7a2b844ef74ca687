//! Failed-login lockout, scoped per login surface.
//!
//! Each context (e.g. `admin_panel`, `control_panel`) keeps its own attempt
//! counter under its own key, so the panels lock out independently. Expiry is
//! evaluated lazily on the next status check, never by a timer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::{Database, DbResult};
use crate::store::StateStore;

/// Context used by the admin panel login.
pub const ADMIN_PANEL: &str = "admin_panel";
/// Context used by the clinic control panel login.
pub const CONTROL_PANEL: &str = "control_panel";

/// Key under which a context's record is stored.
pub fn lockout_key(context: &str) -> String {
    format!("nidaa_lockout_{}", context)
}

/// Threshold and duration of a lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures that trigger a lock
    pub max_attempts: u32,
    /// How long a lock lasts, in milliseconds
    pub duration_ms: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            duration_ms: 15 * 60 * 1000,
        }
    }
}

/// Persisted per-context state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockoutState {
    pub attempts: u32,
    pub lockout_timestamp: Option<i64>,
}

/// Result of [`LockoutGuard::check_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutStatus {
    pub is_locked: bool,
    pub remaining_minutes: u32,
}

impl LockoutStatus {
    pub const UNLOCKED: Self = Self {
        is_locked: false,
        remaining_minutes: 0,
    };
}

/// Result of [`LockoutGuard::register_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub locked: bool,
    pub remaining_attempts: u32,
}

/// Per-context failed-attempt counter with time-boxed lockout.
pub struct LockoutGuard {
    store: Arc<StateStore>,
    policy: LockoutPolicy,
}

impl LockoutGuard {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self::with_policy(store, LockoutPolicy::default())
    }

    pub fn with_policy(store: Arc<StateStore>, policy: LockoutPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        self.store.clock()
    }

    /// Report whether the context is locked, clearing an expired lock.
    pub fn check_status(&self, context: &str) -> DbResult<LockoutStatus> {
        let now = self.clock().now_millis();
        let policy = self.policy;
        self.store.with_db(|db| {
            let state = load_state(db, context)?;
            let Some(locked_at) = state.lockout_timestamp else {
                return Ok(LockoutStatus::UNLOCKED);
            };

            let elapsed = now - locked_at;
            if elapsed < policy.duration_ms {
                let remaining_ms = policy.duration_ms - elapsed;
                Ok(LockoutStatus {
                    is_locked: true,
                    remaining_minutes: ceil_minutes(remaining_ms),
                })
            } else {
                debug!(context, "lockout expired");
                save_state(db, context, &LockoutState::default())?;
                Ok(LockoutStatus::UNLOCKED)
            }
        })
    }

    /// Count a failed attempt, locking the context at the threshold.
    pub fn register_failure(&self, context: &str) -> DbResult<FailureOutcome> {
        let now = self.clock().now_millis();
        let policy = self.policy;
        self.store.with_db(|db| {
            let mut state = load_state(db, context)?;
            state.attempts += 1;

            if state.attempts >= policy.max_attempts {
                state.lockout_timestamp = Some(now);
                save_state(db, context, &state)?;
                info!(context, attempts = state.attempts, "login locked out");
                return Ok(FailureOutcome {
                    locked: true,
                    remaining_attempts: 0,
                });
            }

            save_state(db, context, &state)?;
            Ok(FailureOutcome {
                locked: false,
                remaining_attempts: policy.max_attempts - state.attempts,
            })
        })
    }

    /// Reset the context after a successful login.
    pub fn clear(&self, context: &str) -> DbResult<()> {
        self.store.with_db(|db| {
            db.delete_value(&lockout_key(context))?;
            Ok(())
        })
    }

    /// Raw persisted state (for diagnostics and tests).
    pub fn state(&self, context: &str) -> DbResult<LockoutState> {
        self.store.with_db(|db| load_state(db, context))
    }
}

fn load_state(db: &Database, context: &str) -> DbResult<LockoutState> {
    Ok(db.get_json(&lockout_key(context))?.unwrap_or_default())
}

fn save_state(db: &Database, context: &str, state: &LockoutState) -> DbResult<()> {
    db.put_json(&lockout_key(context), state)
}

fn ceil_minutes(ms: i64) -> u32 {
    let minutes = (ms + 59_999) / 60_000;
    minutes.clamp(0, u32::MAX as i64) as u32
}
