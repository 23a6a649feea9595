//! Account model and request/response DTOs.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Default paper-trading balance for new accounts.
pub const DEFAULT_BALANCE: f64 = 50_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Identity record. Password and PIN hashes are optional: OAuth-only
/// accounts carry neither until the user sets them.
///
/// The two failure counter / lock expiry pairs are mutated only by the
/// lockout policy during verify operations. A lock expiry in the future
/// rejects verification attempts regardless of the counter value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
    pub pin_hash: Option<String>,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub biometric_key: Option<String>,
    pub password_failures: i32,
    pub pin_failures: i32,
    pub password_locked_until: Option<DateTime<Utc>>,
    pub pin_locked_until: Option<DateTime<Utc>>,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Capability flag reported on login; never the raw phone number.
    pub fn phone_exists(&self) -> bool {
        self.phone_number.is_some()
    }

    /// Capability flag reported on login; never the hash itself.
    pub fn pin_exists(&self) -> bool {
        self.pin_hash.is_some()
    }
}

/// Profile fields safe to return to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_exist: bool,
    pub login_pin_exist: bool,
    pub balance: f64,
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Profile {
            user_id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            gender: account.gender,
            date_of_birth: account.date_of_birth,
            phone_exist: account.phone_exists(),
            login_pin_exist: account.pin_exists(),
            balance: account.balance,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub register_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OAuthSignInRequest {
    pub provider: String,
    pub id_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    /// Client class the refresh token was issued for: "app" or "socket".
    #[serde(rename = "type")]
    pub audience: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PinRequest {
    pub login_pin: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}
