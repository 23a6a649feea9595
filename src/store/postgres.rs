//! Postgres-backed account store.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{Account, Gender};
use crate::store::{AccountStore, AccountUpdate, NewAccount};

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write the full mutable column set back after applying an update in
    /// Rust. Read-modify-write, consistent with the documented weak
    /// consistency of lockout counters.
    async fn write_back(&self, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts SET
                phone_number = $2,
                password_hash = $3,
                pin_hash = $4,
                name = $5,
                gender = $6,
                date_of_birth = $7,
                email_verified = $8,
                phone_verified = $9,
                biometric_key = $10,
                password_failures = $11,
                pin_failures = $12,
                password_locked_until = $13,
                pin_locked_until = $14,
                balance = $15,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(account.phone_number.as_deref())
        .bind(account.password_hash.as_deref())
        .bind(account.pin_hash.as_deref())
        .bind(account.name.as_deref())
        .bind(account.gender.map(|g| g.as_str()))
        .bind(account.date_of_birth)
        .bind(account.email_verified)
        .bind(account.phone_verified)
        .bind(account.biometric_key.as_deref())
        .bind(account.password_failures)
        .bind(account.pin_failures)
        .bind(account.password_locked_until)
        .bind(account.pin_locked_until)
        .bind(account.balance)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        Ok(row.into())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, email, password_hash, name, email_verified, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(&new.email)
        .bind(new.password_hash.as_deref())
        .bind(new.name.as_deref())
        .bind(new.email_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        Ok(row.into())
    }

    async fn update(&self, id: Uuid, update: AccountUpdate) -> Result<Option<Account>> {
        let Some(mut account) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        update.apply(&mut account);
        Ok(Some(self.write_back(&account).await?))
    }

    async fn upsert_by_email(&self, email: &str, update: AccountUpdate) -> Result<Account> {
        match self.find_by_email(email).await? {
            Some(account) => {
                let updated = self.update(account.id, update).await?;
                updated.ok_or_else(|| AuthError::NotFound("Account not found".to_string()))
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
                updated.ok_or_else(|| AuthError::NotFound("Account not found".to_string()))
            }
        }
    }
}

fn map_constraint_error(e: sqlx::Error) -> AuthError {
    if e.to_string().contains("unique constraint") {
        AuthError::Conflict("Account already exists".to_string())
    } else {
        AuthError::Database(e.to_string())
    }
}

/// Raw row shape; gender travels as text and is parsed into the enum.
#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    phone_number: Option<String>,
    password_hash: Option<String>,
    pin_hash: Option<String>,
    name: Option<String>,
    gender: Option<String>,
    date_of_birth: Option<NaiveDate>,
    email_verified: bool,
    phone_verified: bool,
    biometric_key: Option<String>,
    password_failures: i32,
    pin_failures: i32,
    password_locked_until: Option<DateTime<Utc>>,
    pin_locked_until: Option<DateTime<Utc>>,
    balance: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            pin_hash: row.pin_hash,
            name: row.name,
            gender: row.gender.as_deref().and_then(Gender::parse),
            date_of_birth: row.date_of_birth,
            email_verified: row.email_verified,
            phone_verified: row.phone_verified,
            biometric_key: row.biometric_key,
            password_failures: row.password_failures,
            pin_failures: row.pin_failures,
            password_locked_until: row.password_locked_until,
            pin_locked_until: row.pin_locked_until,
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
