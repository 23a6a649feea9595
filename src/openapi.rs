use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::ErrorResponse;
use crate::handlers::account::{ProfileResponse, SocketTokensResponse};
use crate::handlers::auth::{AuthResponse, RefreshTokenResponse};
use crate::models::account::{
    LoginRequest, OAuthSignInRequest, PinRequest, RefreshTokenRequest, RegisterRequest,
    UpdateProfileRequest,
};
use crate::models::{Gender, Profile};
use crate::security::TokenPair;
use crate::services::SessionUser;

/// OpenAPI document covering the REST surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::oauth_sign_in,
        crate::handlers::auth::refresh_token,
        crate::handlers::account::set_pin,
        crate::handlers::account::verify_pin,
        crate::handlers::account::update_profile
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        OAuthSignInRequest,
        RefreshTokenRequest,
        PinRequest,
        UpdateProfileRequest,
        AuthResponse,
        RefreshTokenResponse,
        SocketTokensResponse,
        ProfileResponse,
        SessionUser,
        TokenPair,
        Profile,
        Gender,
        ErrorResponse
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token APIs"),
        (name = "Account", description = "Authenticated PIN and profile APIs")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
