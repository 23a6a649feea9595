//! HTTP handlers.
pub mod account;
pub mod auth;

pub use account::{set_pin, update_profile, verify_pin};
pub use auth::{login, oauth_sign_in, refresh_token, register};

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
