use std::sync::Arc;

use super::{HasherError, PasswordHasher};

/// Chains hashers so stored hashes can migrate to a newer algorithm.
///
/// New hashes always come from the first hasher; checks accept a match from
/// any of them, and `needs_rehash` defers to the first one.
#[derive(Clone)]
pub struct FallbackPasswordHasher {
    hashers: Vec<Arc<dyn PasswordHasher>>,
}

impl FallbackPasswordHasher {
    pub fn new(hashers: Vec<Arc<dyn PasswordHasher>>) -> Result<Self, HasherError> {
        if hashers.is_empty() {
            return Err(HasherError::Parameters(
                "fallback hasher needs at least one hasher".to_string(),
            ));
        }
        Ok(Self { hashers })
    }

    pub fn hashers(&self) -> &[Arc<dyn PasswordHasher>] {
        &self.hashers
    }
}

impl PasswordHasher for FallbackPasswordHasher {
    fn hash(&self, password: &str) -> Result<String, HasherError> {
        self.hashers[0].hash(password)
    }

    fn check(&self, password: &str, hashed: &str) -> bool {
        self.hashers
            .iter()
            .any(|hasher| hasher.check(password, hashed))
    }

    fn needs_rehash(&self, hashed: &str) -> bool {
        self.hashers[0].needs_rehash(hashed)
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
