//! OAuth identity verification seam.
//!
//! The core never inspects provider token formats; a provider-specific
//! verifier turns an id token into a `VerifiedIdentity` (or fails), and the
//! orchestrator only sees the verified outcome.
use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AuthError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Apple => "apple",
        }
    }

    /// Accepts only the supported providers; anything else is an invalid
    /// request, and a supported-but-unconfigured provider is reported
    /// separately by the registry lookup.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(OAuthProvider::Google),
            "apple" => Some(OAuthProvider::Apple),
            _ => None,
        }
    }
}

/// Outcome of a successful provider-side verification.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity>;
}

/// Provider -> verifier lookup, populated at startup from configuration.
#[derive(Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<OAuthProvider, Box<dyn IdentityVerifier>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: OAuthProvider, verifier: Box<dyn IdentityVerifier>) -> Self {
        self.verifiers.insert(provider, verifier);
        self
    }

    pub fn get(&self, provider: OAuthProvider) -> Result<&dyn IdentityVerifier> {
        self.verifiers
            .get(&provider)
            .map(|v| v.as_ref())
            .ok_or_else(|| {
                AuthError::InvalidRequest(format!(
                    "Sign-in with {} is not enabled",
                    provider.as_str()
                ))
            })
    }
}

/// Verifies Google-issued id tokens against the tokeninfo endpoint and the
/// configured client id.
pub struct GoogleTokenVerifier {
    http: reqwest::Client,
    client_id: String,
}

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    aud: String,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity> {
        let response = self
            .http
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("tokeninfo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::Unauthenticated(
                "Invalid token or expired".to_string(),
            ));
        }

        let info: GoogleTokenInfo = response
            .json()
            .await
            .map_err(|_| AuthError::Unauthenticated("Invalid token or expired".to_string()))?;

        if info.aud != self.client_id {
            tracing::warn!("google id token presented with mismatched audience");
            return Err(AuthError::Unauthenticated(
                "Invalid token or expired".to_string(),
            ));
        }

        let email = info.email.ok_or_else(|| {
            AuthError::Unauthenticated("Invalid token or expired".to_string())
        })?;

        Ok(VerifiedIdentity {
            email,
            name: info.name,
        })
    }
}
