//! Configuration management.
//!
//! All settings come from the environment once at startup (`envy`), then get
//! carried through the process as plain structs. Core logic never reads
//! ambient state: the token signer and lockout policy are constructed from
//! this config and passed by reference.
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    pub database_url: String,

    // Signing secrets, one per audience x role, plus the registration
    // assertion secret. App and socket tokens are never interchangeable.
    pub app_access_secret: String,
    pub app_refresh_secret: String,
    pub socket_access_secret: String,
    pub socket_refresh_secret: String,
    pub register_secret: String,

    #[serde(default = "default_access_expiry")]
    pub app_access_expiry_secs: i64,
    #[serde(default = "default_refresh_expiry")]
    pub app_refresh_expiry_secs: i64,
    #[serde(default = "default_access_expiry")]
    pub socket_access_expiry_secs: i64,
    #[serde(default = "default_refresh_expiry")]
    pub socket_refresh_expiry_secs: i64,
    #[serde(default = "default_register_expiry")]
    pub register_expiry_secs: i64,

    // Lockout policy. Fixed product constants (3 attempts, 30 minutes) but
    // kept configurable for tests.
    #[serde(default = "default_lockout_max_failures")]
    pub lockout_max_failures: u32,
    #[serde(default = "default_lockout_duration_mins")]
    pub lockout_duration_mins: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    pub google_client_id: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_access_expiry() -> i64 {
    900 // 15 minutes
}

fn default_refresh_expiry() -> i64 {
    30 * 24 * 3600
}

fn default_register_expiry() -> i64 {
    600
}

fn default_lockout_max_failures() -> u32 {
    3
}

fn default_lockout_duration_mins() -> i64 {
    30
}

fn default_bcrypt_cost() -> u32 {
    10
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
