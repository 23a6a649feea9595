//! Auth orchestrator: composes the hasher, lockout policy, token signer and
//! account store into the register / login / oauth / pin / refresh flows.
//!
//! Every operation returns an explicit `Result`; credential-verification
//! errors propagate unchanged to the caller, and the refresh path collapses
//! all of its failures into one outward signal.
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AuthError, Result};
use crate::models::account::UpdateProfileRequest;
use crate::models::{Account, Gender, Profile};
use crate::security::lockout::LockoutState;
use crate::security::{Audience, CredentialKind, Hasher, LockoutPolicy, TokenPair, TokenRole, TokenSettings, TokenSigner};
use crate::services::oauth::VerifiedIdentity;
use crate::store::{AccountStore, AccountUpdate, NewAccount};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("valid email regex"));

fn valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

fn valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Identity snapshot returned on login-like flows. Carries capability
/// flags, never the underlying phone number or hashes.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub phone_exist: bool,
    pub login_pin_exist: bool,
}

impl From<&Account> for SessionUser {
    fn from(account: &Account) -> Self {
        SessionUser {
            user_id: account.id,
            name: account.name.clone(),
            phone_exist: account.phone_exists(),
            login_pin_exist: account.pin_exists(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthSession {
    pub user: SessionUser,
    pub tokens: TokenPair,
}

pub struct AuthService {
    store: Arc<dyn AccountStore>,
    hasher: Hasher,
    lockout: LockoutPolicy,
    tokens: TokenSigner,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: Hasher,
        lockout: LockoutPolicy,
        tokens: TokenSigner,
    ) -> Self {
        Self {
            store,
            hasher,
            lockout,
            tokens,
        }
    }

    pub fn from_config(store: Arc<dyn AccountStore>, config: &Config) -> Self {
        Self::new(
            store,
            Hasher::new(config.bcrypt_cost),
            LockoutPolicy::new(config.lockout_max_failures, config.lockout_duration_mins),
            TokenSigner::new(TokenSettings::from_config(config)),
        )
    }

    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Register with email, password and a registration assertion proving
    /// email ownership.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        register_token: &str,
    ) -> Result<AuthSession> {
        if !valid_email(email) || password.is_empty() || register_token.is_empty() {
            return Err(AuthError::InvalidRequest("Invalid request".to_string()));
        }

        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::Conflict("Account already exists".to_string()));
        }

        let claims = self
            .tokens
            .verify_registration(register_token)
            .map_err(|_| AuthError::InvalidRequest("Invalid token or expired".to_string()))?;
        if claims.email != email {
            return Err(AuthError::InvalidRequest("Invalid token or expired".to_string()));
        }

        let password_hash = self.hasher.hash(password)?;
        let account = self
            .store
            .create(NewAccount {
                email: email.to_string(),
                password_hash: Some(password_hash),
                name: None,
                email_verified: true,
            })
            .await?;

        tracing::info!(account_id = %account.id, "account registered");
        self.session(&account, Audience::App)
    }

    /// Password login. Lockout check runs before the hash comparison and
    /// the failure counter updates after it; verification errors propagate
    /// to the caller instead of being logged away.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidRequest(
                "Please provide email and password".to_string(),
            ));
        }

        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::Unauthenticated("Invalid credentials".to_string()))?;

        // OAuth-only accounts have no password until one is set.
        let stored_hash = account
            .password_hash
            .clone()
            .ok_or_else(|| AuthError::Unauthenticated("Invalid credentials".to_string()))?;

        self.verify_credential(&account, CredentialKind::Password, password, &stored_hash)
            .await?;

        tracing::info!(account_id = %account.id, "login succeeded");
        self.session(&account, Audience::App)
    }

    /// Sign in with an already-verified external identity. No password
    /// check; the account is created on first sight of the email.
    pub async fn oauth_sign_in(&self, identity: VerifiedIdentity) -> Result<AuthSession> {
        if !valid_email(&identity.email) {
            return Err(AuthError::Unauthenticated(
                "Invalid token or expired".to_string(),
            ));
        }

        let account = self
            .store
            .upsert_by_email(
                &identity.email,
                AccountUpdate {
                    email_verified: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        // Adopt the provider-supplied display name only when none is set.
        let account = match (&account.name, identity.name) {
            (None, Some(name)) => self
                .store
                .update(
                    account.id,
                    AccountUpdate {
                        name: Some(name),
                        ..Default::default()
                    },
                )
                .await?
                .unwrap_or(account),
            _ => account,
        };

        tracing::info!(account_id = %account.id, "oauth sign-in succeeded");
        self.session(&account, Audience::App)
    }

    /// Rotate an access/refresh pair. All internal failures (bad
    /// signature, expiry, malformed subject, missing account) collapse to
    /// one `Unauthenticated` answer so the caller learns nothing else.
    pub async fn refresh(&self, refresh_token: &str, audience: Audience) -> Result<TokenPair> {
        match self.try_refresh(refresh_token, audience).await {
            Ok(pair) => Ok(pair),
            Err(err) => {
                tracing::debug!(%err, "refresh rejected");
                Err(AuthError::Unauthenticated(
                    "Invalid or expired token".to_string(),
                ))
            }
        }
    }

    async fn try_refresh(&self, refresh_token: &str, audience: Audience) -> Result<TokenPair> {
        let account_id = self
            .tokens
            .verify_subject(refresh_token, audience, TokenRole::Refresh)?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))?;

        self.tokens
            .issue_pair(account.id, account.name.as_deref(), audience)
    }

    /// First-time PIN setup; an existing PIN requires the reset flow. PIN
    /// verification grants socket-scope tokens, distinct from app tokens.
    pub async fn set_pin(&self, account_id: Uuid, pin: &str) -> Result<TokenPair> {
        if !valid_pin(pin) {
            return Err(AuthError::InvalidRequest("Invalid request body".to_string()));
        }

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))?;

        if account.pin_exists() {
            return Err(AuthError::Conflict(
                "Login PIN already set, use the PIN reset flow".to_string(),
            ));
        }

        let pin_hash = self.hasher.hash(pin)?;
        self.store
            .update(
                account.id,
                AccountUpdate {
                    pin_hash: Some(pin_hash),
                    pin_failures: Some(0),
                    pin_locked_until: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(account_id = %account.id, "login pin set");
        self.tokens
            .issue_pair(account.id, account.name.as_deref(), Audience::Socket)
    }

    /// Verify the login PIN and mint socket-scope tokens.
    pub async fn verify_pin(&self, account_id: Uuid, pin: &str) -> Result<TokenPair> {
        if !valid_pin(pin) {
            return Err(AuthError::InvalidRequest("Invalid request body".to_string()));
        }

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))?;

        let stored_hash = account
            .pin_hash
            .clone()
            .ok_or_else(|| AuthError::InvalidRequest("Set your PIN first".to_string()))?;

        self.verify_credential(&account, CredentialKind::Pin, pin, &stored_hash)
            .await?;

        tracing::info!(account_id = %account.id, "pin verified");
        self.tokens
            .issue_pair(account.id, account.name.as_deref(), Audience::Socket)
    }

    /// Partial profile update for the authenticated account.
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile> {
        if let Some(name) = &request.name {
            if name.len() < 3 || name.len() > 50 {
                return Err(AuthError::InvalidRequest(
                    "Name must be between 3 and 50 characters".to_string(),
                ));
            }
        }

        let gender = match &request.gender {
            Some(raw) => Some(
                Gender::parse(raw)
                    .ok_or_else(|| AuthError::InvalidRequest("Invalid gender".to_string()))?,
            ),
            None => None,
        };

        let account = self
            .store
            .update(
                account_id,
                AccountUpdate {
                    name: request.name,
                    gender,
                    date_of_birth: request.date_of_birth,
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))?;

        Ok(Profile::from(&account))
    }

    /// Replace the password. The new plaintext must differ from the
    /// current one; the password lockout state resets alongside.
    pub async fn update_password(&self, email: &str, new_password: &str) -> Result<()> {
        if new_password.is_empty() {
            return Err(AuthError::InvalidRequest("Invalid request".to_string()));
        }

        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))?;

        if let Some(current) = &account.password_hash {
            if self.hasher.verify(new_password, current)? {
                return Err(AuthError::InvalidRequest(
                    "New password must be different from the current password".to_string(),
                ));
            }
        }

        let password_hash = self.hasher.hash(new_password)?;
        self.store
            .update(
                account.id,
                AccountUpdate {
                    password_hash: Some(password_hash),
                    password_failures: Some(0),
                    password_locked_until: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(account_id = %account.id, "password updated");
        Ok(())
    }

    /// Replace the login PIN. Mirrors `update_password` for the PIN
    /// credential.
    pub async fn update_pin(&self, email: &str, new_pin: &str) -> Result<()> {
        if !valid_pin(new_pin) {
            return Err(AuthError::InvalidRequest("Invalid request".to_string()));
        }

        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))?;

        if let Some(current) = &account.pin_hash {
            if self.hasher.verify(new_pin, current)? {
                return Err(AuthError::InvalidRequest(
                    "New PIN must be different from the current PIN".to_string(),
                ));
            }
        }

        let pin_hash = self.hasher.hash(new_pin)?;
        self.store
            .update(
                account.id,
                AccountUpdate {
                    pin_hash: Some(pin_hash),
                    pin_failures: Some(0),
                    pin_locked_until: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(account_id = %account.id, "login pin updated");
        Ok(())
    }

    /// Lockout check -> hash verify -> lockout update, for one credential
    /// type. Failure messages report remaining attempts until the lock
    /// triggers, then switch to minutes remaining.
    async fn verify_credential(
        &self,
        account: &Account,
        kind: CredentialKind,
        plaintext: &str,
        stored_hash: &str,
    ) -> Result<()> {
        let state = lockout_state(account, kind);
        let now = Utc::now();
        self.lockout.check(kind, &state, now)?;

        if self.hasher.verify(plaintext, stored_hash)? {
            self.store
                .update(account.id, lockout_update(kind, self.lockout.record_success()))
                .await?;
            Ok(())
        } else {
            let (next, outcome) = self.lockout.record_failure(&state, now);
            self.store
                .update(account.id, lockout_update(kind, next))
                .await?;
            tracing::warn!(
                account_id = %account.id,
                credential = kind.as_str(),
                "credential verification failed"
            );
            Err(AuthError::Unauthenticated(
                self.lockout.failure_message(kind, &outcome),
            ))
        }
    }

    fn session(&self, account: &Account, audience: Audience) -> Result<AuthSession> {
        let tokens = self
            .tokens
            .issue_pair(account.id, account.name.as_deref(), audience)?;
        Ok(AuthSession {
            user: SessionUser::from(account),
            tokens,
        })
    }
}

fn lockout_state(account: &Account, kind: CredentialKind) -> LockoutState {
    match kind {
        CredentialKind::Password => LockoutState {
            failures: account.password_failures,
            locked_until: account.password_locked_until,
        },
        CredentialKind::Pin => LockoutState {
            failures: account.pin_failures,
            locked_until: account.pin_locked_until,
        },
    }
}

fn lockout_update(kind: CredentialKind, state: LockoutState) -> AccountUpdate {
    match kind {
        CredentialKind::Password => AccountUpdate {
            password_failures: Some(state.failures),
            password_locked_until: Some(state.locked_until),
            ..Default::default()
        },
        CredentialKind::Pin => AccountUpdate {
            pin_failures: Some(state.failures),
            pin_locked_until: Some(state.locked_until),
            ..Default::default()
        },
    }
}
