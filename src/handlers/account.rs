//! Authenticated account handlers: PIN setup/verification and profile.
use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AuthError, ErrorResponse},
    middleware::AuthUser,
    models::account::{PinRequest, UpdateProfileRequest},
    models::Profile,
    security::TokenPair,
    AppState,
};

/// Socket-scope token pair granted by PIN flows.
#[derive(Debug, Serialize, ToSchema)]
pub struct SocketTokensResponse {
    pub success: bool,
    pub socket_tokens: TokenPair,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub data: Profile,
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/set-pin",
    tag = "Account",
    request_body = PinRequest,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "PIN set, socket tokens issued", body = SocketTokensResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 409, description = "PIN already set", body = ErrorResponse)
    )
)]
pub async fn set_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PinRequest>,
) -> Result<Json<SocketTokensResponse>, AuthError> {
    let socket_tokens = state.auth.set_pin(user.0, &payload.login_pin).await?;
    Ok(Json(SocketTokensResponse {
        success: true,
        socket_tokens,
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/verify-pin",
    tag = "Account",
    request_body = PinRequest,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "PIN verified, socket tokens issued", body = SocketTokensResponse),
        (status = 401, description = "Wrong PIN or locked out", body = ErrorResponse)
    )
)]
pub async fn verify_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PinRequest>,
) -> Result<Json<SocketTokensResponse>, AuthError> {
    let socket_tokens = state.auth.verify_pin(user.0, &payload.login_pin).await?;
    Ok(Json(SocketTokensResponse {
        success: true,
        socket_tokens,
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    tag = "Account",
    request_body = UpdateProfileRequest,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
        (status = 404, description = "Account missing", body = ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AuthError> {
    let profile = state.auth.update_profile(user.0, payload).await?;
    Ok(Json(ProfileResponse {
        success: true,
        data: profile,
    }))
}
