//! Password hashing used by identifiers and the cookie authenticator.

mod default;
mod fallback;
mod legacy;

pub use default::DefaultPasswordHasher;
pub use fallback::FallbackPasswordHasher;
pub use legacy::LegacyPasswordHasher;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HasherError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Invalid hasher parameters: {0}")]
    Parameters(String),
}

/// Hashes and verifies secrets.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HasherError>;

    /// Check `password` against a previously produced `hashed` value.
    fn check(&self, password: &str, hashed: &str) -> bool;

    /// Whether `hashed` should be regenerated with the current settings.
    fn needs_rehash(&self, hashed: &str) -> bool;

    fn name(&self) -> &'static str;
}

/// Constant-time byte comparison.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
