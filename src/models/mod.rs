//! Data models for authentication.
pub mod account;

pub use account::{Account, Gender, Profile, DEFAULT_BALANCE};
