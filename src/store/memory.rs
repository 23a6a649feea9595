//! In-memory account store, used by the test suite and as a fallback when
//! running without a database.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{Account, DEFAULT_BALANCE};
use crate::store::{AccountStore, AccountUpdate, NewAccount};

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blank_account(new: NewAccount) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: new.email,
            phone_number: None,
            password_hash: new.password_hash,
            pin_hash: None,
            name: new.name,
            gender: None,
            date_of_birth: None,
            email_verified: new.email_verified,
            phone_verified: false,
            biometric_key: None,
            password_failures: 0,
            pin_failures: 0,
            password_locked_until: None,
            pin_locked_until: None,
            balance: DEFAULT_BALANCE,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == new.email) {
            return Err(AuthError::Conflict("Account already exists".to_string()));
        }
        let account = Self::blank_account(new);
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, id: Uuid, update: AccountUpdate) -> Result<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) => {
                update.apply(account);
                Ok(Some(account.clone()))
            }
            None => Ok(None),
        }
    }

    async fn upsert_by_email(&self, email: &str, update: AccountUpdate) -> Result<Account> {
        let existing = self.find_by_email(email).await?;
        match existing {
            Some(account) => {
                let updated = self.update(account.id, update).await?;
                // The account was just read and the map is private, so it
                // cannot have vanished in between.
                updated.ok_or_else(|| AuthError::Internal("account vanished during upsert".into()))
            }
            None => {
                let created = self
                    .create(NewAccount {
                        email: email.to_string(),
                        password_hash: None,
                        name: update.name.clone(),
                        email_verified: update.email_verified.unwrap_or(false),
                    })
                    .await?;
                let updated = self.update(created.id, update).await?;
                updated.ok_or_else(|| AuthError::Internal("account vanished during upsert".into()))
            }
        }
    }
}
