//! Bearer-token authentication for protected routes.
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AuthError;
use crate::security::{Audience, TokenRole};
use crate::AppState;

/// Account id extracted from a verified app access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AuthError> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AuthError::Unauthenticated("Missing access token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::Unauthenticated("Missing access token".to_string()))?;

        let account_id = state
            .auth
            .tokens()
            .verify_subject(token, Audience::App, TokenRole::Access)?;

        Ok(AuthUser(account_id))
    }
}
