use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Credentials, Identification, Identifier, CREDENTIAL_PASSWORD, CREDENTIAL_USERNAME};
use crate::hasher::{DefaultPasswordHasher, PasswordHasher};
use crate::identity::Record;
use crate::resolver::{Conditions, QueryKind, Resolver};

/// Identifies principals by username and password.
///
/// The username is matched against every configured username field (any
/// may match). When a password is supplied it is verified against the
/// stored hash; a principal without a stored hash is checked against the
/// empty string so the amount of work is the same either way.
pub struct PasswordIdentifier {
    resolver: Arc<dyn Resolver>,
    hasher: Arc<dyn PasswordHasher>,
    username_fields: Vec<String>,
    password_field: String,
}

impl PasswordIdentifier {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            hasher: Arc::new(DefaultPasswordHasher::default()),
            username_fields: vec![CREDENTIAL_USERNAME.to_string()],
            password_field: CREDENTIAL_PASSWORD.to_string(),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_username_fields(mut self, fields: Vec<String>) -> Self {
        self.username_fields = fields;
        self
    }

    pub fn with_password_field(mut self, field: impl Into<String>) -> Self {
        self.password_field = field.into();
        self
    }

    pub fn hasher(&self) -> &Arc<dyn PasswordHasher> {
        &self.hasher
    }

    /// Verify `password` against the stored hash of `identity`.
    ///
    /// Returns whether it matched and whether the hash should be upgraded.
    fn check_password(&self, identity: Option<&Record>, password: &str) -> (bool, bool) {
        let stored = identity
            .and_then(|record| record.get(&self.password_field))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let verified = self.hasher.check(password, stored);
        let needs_rehash = verified && self.hasher.needs_rehash(stored);
        (identity.is_some() && verified, needs_rehash)
    }
}

#[async_trait]
impl Identifier for PasswordIdentifier {
    async fn identify(&self, credentials: &Credentials) -> Identification {
        let Some(username) = credentials.get(CREDENTIAL_USERNAME) else {
            return Identification::not_found();
        };
        let conditions = self
            .username_fields
            .iter()
            .fold(Conditions::new(), |conditions, field| {
                conditions.with(field.as_str(), username)
            });
        let kind = if conditions.len() > 1 {
            QueryKind::Or
        } else {
            QueryKind::All
        };

        let mut errors = Vec::new();
        let identity = match self.resolver.find(&conditions, kind).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Resolver lookup failed");
                errors.push(e.to_string());
                None
            }
        };

        let mut needs_rehash = false;
        if let Some(password) = credentials.get(CREDENTIAL_PASSWORD) {
            let (verified, rehash) = self.check_password(identity.as_ref(), password);
            if !verified {
                debug!(username = %username, "Password check failed");
                return Identification::failed(errors);
            }
            needs_rehash = rehash;
        }
        Identification {
            record: identity,
            errors,
            needs_rehash,
        }
    }

    fn name(&self) -> &str {
        "password"
    }
}
