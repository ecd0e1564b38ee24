//! Credential identifiers: turn extracted credentials into principal data.

mod callback;
mod collection;
mod credentials;
mod ldap;
mod password;
mod token;

pub use callback::CallbackIdentifier;
pub use collection::{CollectionOutcome, IdentifierCollection};
pub use credentials::*;
pub use ldap::{LdapConnector, LdapError, LdapIdentifier};
pub use password::PasswordIdentifier;
pub use token::{TokenHashAlgorithm, TokenIdentifier};

use async_trait::async_trait;

use crate::identity::Record;

/// Outcome of one `identify` call, owned by the caller.
///
/// Identifiers are shared by every request, so diagnostics and the rehash
/// signal travel with the lookup instead of living in the identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identification {
    pub record: Option<Record>,
    /// Diagnostics collected while identifying, e.g. resolver faults.
    pub errors: Vec<String>,
    /// The stored password hash verified but should be regenerated.
    pub needs_rehash: bool,
}

impl Identification {
    pub fn found(record: Record) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    pub fn is_found(&self) -> bool {
        self.record.is_some()
    }

    pub fn into_record(self) -> Option<Record> {
        self.record
    }
}

impl From<Option<Record>> for Identification {
    fn from(record: Option<Record>) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }
}

/// Looks up a principal from credentials.
#[async_trait]
pub trait Identifier: Send + Sync {
    /// Resolve `credentials` to principal data. A miss carries no record.
    async fn identify(&self, credentials: &Credentials) -> Identification;

    fn name(&self) -> &str;
}
