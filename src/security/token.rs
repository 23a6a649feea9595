//! Token issuance and verification.
//!
//! One signer serves both client classes ("app" and "socket") instead of two
//! parallel code paths; every audience x role combination carries its own
//! secret and expiry, so a token minted for one audience always fails the
//! other's verifier. Expiry is embedded at issue time and enforced by the
//! verifier. Tokens are never persisted and only lapse by expiry.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AuthError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    App,
    Socket,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::App => "app",
            Audience::Socket => "socket",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "app" => Some(Audience::App),
            "socket" => Some(Audience::Socket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    Access,
    Refresh,
}

impl TokenRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRole::Access => "access",
            TokenRole::Refresh => "refresh",
        }
    }
}

/// Claims carried by app and socket tokens. Access tokens additionally
/// embed the display name.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub aud: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Claims carried by the registration assertion, minted by the email OTP
/// flow and consumed exactly once during register.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Secret and expiry for one audience x role combination.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub secret: String,
    pub expiry_secs: i64,
}

/// The five signing configurations the service needs: four for the
/// audience x role grid plus the registration assertion.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub app_access: SigningConfig,
    pub app_refresh: SigningConfig,
    pub socket_access: SigningConfig,
    pub socket_refresh: SigningConfig,
    pub registration: SigningConfig,
}

impl TokenSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_access: SigningConfig {
                secret: config.app_access_secret.clone(),
                expiry_secs: config.app_access_expiry_secs,
            },
            app_refresh: SigningConfig {
                secret: config.app_refresh_secret.clone(),
                expiry_secs: config.app_refresh_expiry_secs,
            },
            socket_access: SigningConfig {
                secret: config.socket_access_secret.clone(),
                expiry_secs: config.socket_access_expiry_secs,
            },
            socket_refresh: SigningConfig {
                secret: config.socket_refresh_secret.clone(),
                expiry_secs: config.socket_refresh_expiry_secs,
            },
            registration: SigningConfig {
                secret: config.register_secret.clone(),
                expiry_secs: config.register_expiry_secs,
            },
        }
    }
}

pub struct TokenSigner {
    settings: TokenSettings,
}

impl TokenSigner {
    pub fn new(settings: TokenSettings) -> Self {
        Self { settings }
    }

    fn signing(&self, audience: Audience, role: TokenRole) -> &SigningConfig {
        match (audience, role) {
            (Audience::App, TokenRole::Access) => &self.settings.app_access,
            (Audience::App, TokenRole::Refresh) => &self.settings.app_refresh,
            (Audience::Socket, TokenRole::Access) => &self.settings.socket_access,
            (Audience::Socket, TokenRole::Refresh) => &self.settings.socket_refresh,
        }
    }

    /// Issue a short-lived access token for request authentication.
    pub fn issue_access(
        &self,
        account_id: Uuid,
        name: Option<&str>,
        audience: Audience,
    ) -> Result<String> {
        self.issue(account_id, name, audience, TokenRole::Access)
    }

    /// Issue a refresh token, used only to mint new pairs.
    pub fn issue_refresh(&self, account_id: Uuid, audience: Audience) -> Result<String> {
        self.issue(account_id, None, audience, TokenRole::Refresh)
    }

    pub fn issue_pair(
        &self,
        account_id: Uuid,
        name: Option<&str>,
        audience: Audience,
    ) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(account_id, name, audience)?,
            refresh_token: self.issue_refresh(account_id, audience)?,
        })
    }

    fn issue(
        &self,
        account_id: Uuid,
        name: Option<&str>,
        audience: Audience,
        role: TokenRole,
    ) -> Result<String> {
        let signing = self.signing(audience, role);
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            aud: audience.as_str().to_string(),
            token_type: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(signing.expiry_secs)).timestamp(),
            name: name.map(str::to_string),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(signing.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verify signature, expiry, audience and role. Any mismatch maps to a
    /// single `Unauthenticated` error.
    pub fn verify(&self, token: &str, audience: Audience, role: TokenRole) -> Result<Claims> {
        let signing = self.signing(audience, role);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience.as_str()]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(signing.secret.as_bytes()),
            &validation,
        )?;

        if data.claims.token_type != role.as_str() {
            return Err(AuthError::Unauthenticated(
                "Invalid or expired token".to_string(),
            ));
        }

        Ok(data.claims)
    }

    /// Verify a token and parse its subject as an account id.
    pub fn verify_subject(&self, token: &str, audience: Audience, role: TokenRole) -> Result<Uuid> {
        let claims = self.verify(token, audience, role)?;
        Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::Unauthenticated("Invalid or expired token".to_string()))
    }

    /// Mint a registration assertion binding an email address. The email
    /// OTP flow calls this after a successful out-of-band verification.
    pub fn issue_registration(&self, email: &str) -> Result<String> {
        let signing = &self.settings.registration;
        let now = Utc::now();
        let claims = RegistrationClaims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(signing.expiry_secs)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(signing.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("failed to sign registration token: {e}")))
    }

    /// Verify a registration assertion and yield the claimed email.
    pub fn verify_registration(&self, token: &str) -> Result<RegistrationClaims> {
        let signing = &self.settings.registration;
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<RegistrationClaims>(
            token,
            &DecodingKey::from_secret(signing.secret.as_bytes()),
            &validation,
        )?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TokenSettings {
        let cfg = |secret: &str, expiry_secs: i64| SigningConfig {
            secret: secret.to_string(),
            expiry_secs,
        };
        TokenSettings {
            app_access: cfg("app-access-secret", 900),
            app_refresh: cfg("app-refresh-secret", 86_400),
            socket_access: cfg("socket-access-secret", 900),
            socket_refresh: cfg("socket-refresh-secret", 86_400),
            registration: cfg("register-secret", 600),
        }
    }

    fn signer() -> TokenSigner {
        TokenSigner::new(settings())
    }

    #[test]
    fn issue_and_verify_access_token() {
        let signer = signer();
        let id = Uuid::new_v4();
        let token = signer.issue_access(id, Some("Ada"), Audience::App).unwrap();

        let claims = signer.verify(&token, Audience::App, TokenRole::Access).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.aud, "app");
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn audiences_are_not_interchangeable() {
        let signer = signer();
        let id = Uuid::new_v4();

        let socket = signer.issue_access(id, None, Audience::Socket).unwrap();
        assert!(signer.verify(&socket, Audience::App, TokenRole::Access).is_err());

        let app = signer.issue_access(id, None, Audience::App).unwrap();
        assert!(signer.verify(&app, Audience::Socket, TokenRole::Access).is_err());
    }

    #[test]
    fn refresh_token_rejected_by_access_verifier() {
        let signer = signer();
        let token = signer.issue_refresh(Uuid::new_v4(), Audience::App).unwrap();
        assert!(signer.verify(&token, Audience::App, TokenRole::Access).is_err());
    }

    #[test]
    fn tampered_token_fails() {
        let signer = signer();
        let token = signer
            .issue_access(Uuid::new_v4(), None, Audience::App)
            .unwrap();
        let mut tampered = token.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(signer
            .verify(&tampered, Audience::App, TokenRole::Access)
            .is_err());
    }

    #[test]
    fn expired_token_fails() {
        let mut settings = settings();
        settings.app_access.expiry_secs = -300;
        let signer = TokenSigner::new(settings);
        let token = signer
            .issue_access(Uuid::new_v4(), None, Audience::App)
            .unwrap();
        assert!(signer.verify(&token, Audience::App, TokenRole::Access).is_err());
    }

    #[test]
    fn registration_assertion_roundtrip() {
        let signer = signer();
        let token = signer.issue_registration("a@x.com").unwrap();
        let claims = signer.verify_registration(&token).unwrap();
        assert_eq!(claims.email, "a@x.com");
    }

    #[test]
    fn registration_assertion_rejects_other_secrets() {
        let signer = signer();
        // An app refresh token is not a registration assertion.
        let token = signer.issue_refresh(Uuid::new_v4(), Audience::App).unwrap();
        assert!(signer.verify_registration(&token).is_err());
    }

    #[test]
    fn verify_subject_parses_account_id() {
        let signer = signer();
        let id = Uuid::new_v4();
        let token = signer.issue_refresh(id, Audience::Socket).unwrap();
        assert_eq!(
            signer
                .verify_subject(&token, Audience::Socket, TokenRole::Refresh)
                .unwrap(),
            id
        );
    }
}
