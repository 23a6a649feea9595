//! Authentication handlers: register, login, OAuth sign-in and refresh.
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AuthError, ErrorResponse},
    models::account::{LoginRequest, OAuthSignInRequest, RefreshTokenRequest, RegisterRequest},
    security::{Audience, TokenPair},
    services::{AuthSession, OAuthProvider, SessionUser},
    AppState,
};

/// Login/register/oauth response with tokens and capability flags.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub user: SessionUser,
    pub tokens: TokenPair,
}

impl AuthResponse {
    fn new(session: AuthSession) -> Self {
        Self {
            success: true,
            user: session.user,
            tokens: session.tokens,
        }
    }
}

/// Refresh response with the rotated pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshTokenResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account registered", body = AuthResponse),
        (status = 400, description = "Invalid input or registration assertion", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let session = state
        .auth
        .register(&payload.email, &payload.password, &payload.register_token)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(session))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials or locked out", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let session = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(AuthResponse::new(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/oauth",
    tag = "Auth",
    request_body = OAuthSignInRequest,
    responses(
        (status = 200, description = "Signed in with provider identity", body = AuthResponse),
        (status = 400, description = "Unknown or disabled provider", body = ErrorResponse),
        (status = 401, description = "Provider token rejected", body = ErrorResponse)
    )
)]
pub async fn oauth_sign_in(
    State(state): State<AppState>,
    Json(payload): Json<OAuthSignInRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let provider = OAuthProvider::parse(&payload.provider)
        .ok_or_else(|| AuthError::InvalidRequest("Invalid request".to_string()))?;

    let identity = state
        .oauth
        .get(provider)?
        .verify(&payload.id_token)
        .await?;

    let session = state.auth.oauth_sign_in(identity).await?;
    Ok(Json(AuthResponse::new(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Pair rotated", body = RefreshTokenResponse),
        (status = 400, description = "Unknown audience", body = ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, AuthError> {
    let audience = Audience::parse(&payload.audience)
        .ok_or_else(|| AuthError::InvalidRequest("Invalid request body".to_string()))?;

    let TokenPair {
        access_token,
        refresh_token,
    } = state.auth.refresh(&payload.refresh_token, audience).await?;

    Ok(Json(RefreshTokenResponse {
        success: true,
        access_token,
        refresh_token,
    }))
}
