//! Testing utilities and mock implementations.
//!
//! Mocks stand in for authenticators and storage so the service and the
//! middleware can be exercised without real credential stores.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatehouse_core::testing::{fixtures, MockAuthenticator};
//! use gatehouse_core::{AuthenticationService, AuthenticatorCollection};
//!
//! let collection = AuthenticatorCollection::new()
//!     .with(Arc::new(MockAuthenticator::failing("first")))
//!     .with(Arc::new(MockAuthenticator::succeeding("second", fixtures::record(json!({"id": 1})))));
//!
//! let mut service = AuthenticationService::new(collection);
//! assert!(service.authenticate(&request).await?);
//! ```

mod mock_authenticator;
mod mock_storage;

pub use mock_authenticator::MockAuthenticator;
pub use mock_storage::MockStorage;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::Value;
    use std::sync::Arc;

    use crate::auth::digest_ha1;
    use crate::hasher::{DefaultPasswordHasher, PasswordHasher};
    use crate::identifier::{PasswordIdentifier, TokenIdentifier};
    use crate::identity::Record;
    use crate::resolver::MemoryResolver;

    /// Realm used for the `ha1` values of [`user_records`].
    pub const REALM: &str = "localhost";

    /// Convert a JSON object literal into a record. Non-objects give an empty record.
    pub fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    /// Argon2id hasher with minimal cost parameters.
    pub fn hasher() -> DefaultPasswordHasher {
        DefaultPasswordHasher::with_params(8, 1, 1).expect("valid argon2 parameters")
    }

    /// Users `mariano` (password `password`) and `robert` (password `robert`),
    /// with API tokens and digest HA1 values.
    pub fn user_records() -> Vec<Record> {
        let hasher = hasher();
        [(1, "mariano", "password"), (2, "robert", "robert")]
            .into_iter()
            .map(|(id, username, password)| {
                record(serde_json::json!({
                    "id": id,
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": hasher.hash(password).expect("hash fixture password"),
                    "token": format!("token-{id}"),
                    "ha1": digest_ha1(username, password, REALM),
                }))
            })
            .collect()
    }

    pub fn resolver() -> Arc<MemoryResolver> {
        Arc::new(MemoryResolver::new(user_records()))
    }

    pub fn password_identifier() -> Arc<PasswordIdentifier> {
        Arc::new(PasswordIdentifier::new(resolver()).with_hasher(Arc::new(hasher())))
    }

    pub fn token_identifier() -> Arc<TokenIdentifier> {
        Arc::new(TokenIdentifier::new(resolver()))
    }

    pub fn jwt_subject_identifier() -> Arc<TokenIdentifier> {
        Arc::new(TokenIdentifier::jwt_subject(resolver()))
    }
}
