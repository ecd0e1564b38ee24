use sha2::{Digest, Sha256};

use super::{constant_time_eq, HasherError, PasswordHasher};

/// Salted SHA-256 hasher for hashes created by older systems.
///
/// Stored values are the lower-case hex digest of `salt + password`.
#[derive(Debug, Clone, Default)]
pub struct LegacyPasswordHasher {
    salt: String,
}

impl LegacyPasswordHasher {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }
}

impl PasswordHasher for LegacyPasswordHasher {
    fn hash(&self, password: &str) -> Result<String, HasherError> {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(password.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    fn check(&self, password: &str, hashed: &str) -> bool {
        match self.hash(password) {
            Ok(computed) => constant_time_eq(computed.as_bytes(), hashed.to_lowercase().as_bytes()),
            Err(_) => false,
        }
    }

    fn needs_rehash(&self, _hashed: &str) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "legacy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let hasher = LegacyPasswordHasher::default();
        assert_eq!(
            hasher.hash("password").unwrap(),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_salt_changes_digest() {
        let plain = LegacyPasswordHasher::default();
        let salted = LegacyPasswordHasher::new("pepper");
        let hashed = salted.hash("password").unwrap();
        assert_ne!(hashed, plain.hash("password").unwrap());
        assert!(salted.check("password", &hashed));
        assert!(salted.check("password", &hashed.to_uppercase()));
        assert!(!plain.check("password", &hashed));
    }
}
