//! Brute-force lockout policy.
//!
//! Each account carries two independent instances of this state machine,
//! one per credential type, so a PIN brute-force attempt can never lock the
//! user out of password login or vice versa. The machine has two states:
//! OPEN (failures below the threshold, no active lock) and LOCKED (lock
//! expiry in the future). Reaching the threshold sets the lock expiry and
//! resets the counter; a successful verify clears both.
//!
//! The policy is pure over `(state, now)` so tests inject clocks instead of
//! sleeping.
use chrono::{DateTime, Duration, Utc};

use crate::error::{AuthError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Password,
    Pin,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Password => "password",
            CredentialKind::Pin => "pin",
        }
    }
}

/// Per-credential counter and lock expiry, as read from the account record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LockoutState {
    pub failures: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Result of recording a failed verify.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureOutcome {
    /// Still OPEN; this many attempts left before the lock triggers.
    AttemptsRemaining(u32),
    /// The failure crossed the threshold and the lock is now active.
    Locked { until: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_failures: u32,
    lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 3,
            lock_duration: Duration::minutes(30),
        }
    }
}

impl LockoutPolicy {
    pub fn new(max_failures: u32, lock_duration_mins: i64) -> Self {
        Self {
            max_failures,
            lock_duration: Duration::minutes(lock_duration_mins),
        }
    }

    pub fn lock_duration_mins(&self) -> i64 {
        self.lock_duration.num_minutes()
    }

    /// Gate a verify attempt. While the lock expiry is in the future the
    /// attempt is rejected immediately, before any hash comparison runs.
    pub fn check(&self, kind: CredentialKind, state: &LockoutState, now: DateTime<Utc>) -> Result<()> {
        if let Some(until) = state.locked_until {
            if until > now {
                return Err(AuthError::Unauthenticated(format!(
                    "Account is locked for {}. Please try again after {} minute(s)",
                    kind.as_str(),
                    minutes_remaining(until, now),
                )));
            }
        }
        Ok(())
    }

    /// Record a failed verify and compute the next state.
    pub fn record_failure(
        &self,
        state: &LockoutState,
        now: DateTime<Utc>,
    ) -> (LockoutState, FailureOutcome) {
        let failures = state.failures + 1;
        if failures >= self.max_failures as i32 {
            let until = now + self.lock_duration;
            (
                LockoutState {
                    failures: 0,
                    locked_until: Some(until),
                },
                FailureOutcome::Locked { until },
            )
        } else {
            let remaining = self.max_failures - failures as u32;
            (
                LockoutState {
                    failures,
                    locked_until: state.locked_until,
                },
                FailureOutcome::AttemptsRemaining(remaining),
            )
        }
    }

    /// Successful verify: reset the counter and clear any expired lock.
    pub fn record_success(&self) -> LockoutState {
        LockoutState::default()
    }

    pub fn failure_message(&self, kind: CredentialKind, outcome: &FailureOutcome) -> String {
        match outcome {
            FailureOutcome::AttemptsRemaining(n) => {
                format!("Invalid {}, {} attempt(s) remaining", kind.as_str(), n)
            }
            FailureOutcome::Locked { .. } => format!(
                "Invalid {} attempts exceeded. Please try again after {} minutes",
                kind.as_str(),
                self.lock_duration.num_minutes(),
            ),
        }
    }
}

/// Whole minutes until the lock expires, rounded up.
fn minutes_remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (until - now).num_seconds().max(0);
    (seconds + 59) / 60
}
