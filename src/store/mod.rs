//! The account store seam.
//!
//! The core treats persistence as an abstract record store behind this
//! trait. Production uses Postgres; tests use the in-memory store. The
//! verify-then-update sequence on lockout counters is read-modify-write
//! without optimistic locking: concurrent attempts against one account may
//! under-count failures, which is an accepted weak-consistency point.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Account, Gender};

pub mod memory;
pub mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Fields required to create an account. Everything else starts at its
/// column default.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub email_verified: bool,
}

/// Partial account update; `None` leaves a field unchanged. Nullable
/// columns use a double `Option` so callers can distinguish "leave alone"
/// from "clear". Covers exactly the fields the auth flows write; the
/// phone and biometric columns are owned by flows outside this service.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub email_verified: Option<bool>,
    pub password_hash: Option<String>,
    pub pin_hash: Option<String>,
    pub password_failures: Option<i32>,
    pub pin_failures: Option<i32>,
    pub password_locked_until: Option<Option<DateTime<Utc>>>,
    pub pin_locked_until: Option<Option<DateTime<Utc>>>,
}

impl AccountUpdate {
    /// Apply this update to an account record in place.
    pub fn apply(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = Some(name.clone());
        }
        if let Some(gender) = self.gender {
            account.gender = Some(gender);
        }
        if let Some(dob) = self.date_of_birth {
            account.date_of_birth = Some(dob);
        }
        if let Some(verified) = self.email_verified {
            account.email_verified = verified;
        }
        if let Some(hash) = &self.password_hash {
            account.password_hash = Some(hash.clone());
        }
        if let Some(hash) = &self.pin_hash {
            account.pin_hash = Some(hash.clone());
        }
        if let Some(failures) = self.password_failures {
            account.password_failures = failures;
        }
        if let Some(failures) = self.pin_failures {
            account.pin_failures = failures;
        }
        if let Some(until) = self.password_locked_until {
            account.password_locked_until = until;
        }
        if let Some(until) = self.pin_locked_until {
            account.pin_locked_until = until;
        }
        account.updated_at = Utc::now();
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Create an account. Fails with `Conflict` when the email is already
    /// taken.
    async fn create(&self, new: NewAccount) -> Result<Account>;

    /// Apply a partial update; `None` when no account has that id.
    async fn update(&self, id: Uuid, update: AccountUpdate) -> Result<Option<Account>>;

    /// Create-or-update keyed by email; used by the OAuth sign-in path.
    async fn upsert_by_email(&self, email: &str, update: AccountUpdate) -> Result<Account>;
}
