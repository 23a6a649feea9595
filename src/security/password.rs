//! Credential hashing for passwords and PINs using bcrypt.
//!
//! The same hasher serves both credential types: each call salts anew, so
//! hashing the same plaintext twice never produces the same string, and
//! comparison goes through `bcrypt::verify` (constant-time inside the
//! library), never string equality.
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    cost: u32,
}

impl Default for Hasher {
    fn default() -> Self {
        Self { cost: 10 }
    }
}

impl Hasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext credential with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// Verify a plaintext credential against a stored hash.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(plaintext, hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps the test suite fast; production uses 10.
    fn hasher() -> Hasher {
        Hasher::new(4)
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hasher().hash("pw123").unwrap();
        assert!(hasher().verify("pw123", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_plaintext() {
        let hash = hasher().hash("pw123").unwrap();
        assert!(!hasher().verify("pw124", &hash).unwrap());
    }

    #[test]
    fn same_plaintext_hashes_differently() {
        let first = hasher().hash("pin-1234").unwrap();
        let second = hasher().hash("pin-1234").unwrap();
        assert_ne!(first, second);
        assert!(hasher().verify("pin-1234", &first).unwrap());
        assert!(hasher().verify("pin-1234", &second).unwrap());
    }

    #[test]
    fn verify_fails_on_malformed_hash() {
        assert!(hasher().verify("pw123", "not-a-bcrypt-hash").is_err());
    }
}
