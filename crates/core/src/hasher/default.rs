use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};

use super::{HasherError, PasswordHasher};

/// Argon2id hasher producing PHC strings.
#[derive(Debug, Clone)]
pub struct DefaultPasswordHasher {
    params: Params,
}

impl Default for DefaultPasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl DefaultPasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit cost parameters (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HasherError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| HasherError::Parameters(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for DefaultPasswordHasher {
    fn hash(&self, password: &str) -> Result<String, HasherError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HasherError::Hash(e.to_string()))
    }

    fn check(&self, password: &str, hashed: &str) -> bool {
        match PasswordHash::new(hashed) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn needs_rehash(&self, hashed: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hashed) else {
            return true;
        };
        if parsed.algorithm.as_str() != Algorithm::Argon2id.as_str() {
            return true;
        }
        let current = [
            ("m", self.params.m_cost()),
            ("t", self.params.t_cost()),
            ("p", self.params.p_cost()),
        ];
        current
            .iter()
            .any(|(name, value)| parsed.params.get_decimal(*name) != Some(*value))
    }

    fn name(&self) -> &'static str {
        "default"
    }
}
