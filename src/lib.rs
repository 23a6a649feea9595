//! TradePulse Auth Service library.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod security;
pub mod services;
pub mod store;

pub use error::{AuthError, Result};

// Re-export commonly used types
pub use models::{Account, Gender, Profile};
pub use security::{Audience, TokenPair, TokenRole};
pub use services::{AuthService, VerifierRegistry};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub oauth: Arc<VerifierRegistry>,
}
