//! Security building blocks: credential hashing, brute-force lockout and
//! the audience-scoped token signer.
pub mod lockout;
pub mod password;
pub mod token;

pub use lockout::{CredentialKind, LockoutPolicy, LockoutState};
pub use password::Hasher;
pub use token::{Audience, TokenPair, TokenRole, TokenSettings, TokenSigner};
