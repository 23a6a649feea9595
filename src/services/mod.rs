//! Service layer: the auth orchestrator and the OAuth verifier seam.
pub mod auth_service;
pub mod oauth;

pub use auth_service::{AuthService, AuthSession, SessionUser};
pub use oauth::{GoogleTokenVerifier, IdentityVerifier, OAuthProvider, VerifiedIdentity, VerifierRegistry};
