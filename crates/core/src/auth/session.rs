//! Authentication from identity data kept in the server-side session.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{
    AuthError, AuthResult, AuthStatus, Authenticator, PersistenceAuthenticator, PersistenceResult,
};
use crate::http::{AuthRequest, AuthResponse};
use crate::identifier::{Credentials, Identifier, CREDENTIAL_USERNAME};
use crate::identity::Identity;
use crate::storage::{SessionStorage, Storage};

pub struct SessionAuthenticator {
    identifier: Arc<dyn Identifier>,
    storage: Arc<dyn Storage>,
    identify: bool,
    fields: Vec<(String, String)>,
    identity_attribute: String,
}

impl SessionAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>) -> Self {
        Self {
            identifier,
            storage: Arc::new(SessionStorage::default()),
            identify: false,
            fields: vec![(
                CREDENTIAL_USERNAME.to_string(),
                CREDENTIAL_USERNAME.to_string(),
            )],
            identity_attribute: "identity".to_string(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Re-check the stored identity against the identifier on every request.
    pub fn with_identify(mut self, identify: bool) -> Self {
        self.identify = identify;
        self
    }

    /// Map credential keys to fields of the stored identity.
    pub fn with_fields(mut self, fields: Vec<(String, String)>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_identity_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.identity_attribute = attribute.into();
        self
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let stored = match self.storage.read(request).await {
            Some(Value::Object(record)) if !record.is_empty() => record,
            _ => return AuthResult::failure(AuthStatus::FailureIdentityNotFound, Vec::new()),
        };

        if !self.identify {
            return AuthResult::success(stored);
        }

        let credentials: Credentials = self
            .fields
            .iter()
            .filter_map(|(key, field)| {
                let value = match stored.get(field)? {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key.clone(), value))
            })
            .collect();
        let identification = self.identifier.identify(&credentials).await;
        AuthResult::from_identification(identification, AuthStatus::FailureCredentialsInvalid)
    }

    fn name(&self) -> &str {
        "session"
    }

    fn as_persistent(&self) -> Option<&dyn PersistenceAuthenticator> {
        Some(self)
    }
}

#[async_trait]
impl PersistenceAuthenticator for SessionAuthenticator {
    /// Writes the identity unless the session already holds one.
    async fn persist_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
        identity: &Identity,
    ) -> Result<PersistenceResult, AuthError> {
        let response = if self.storage.read(request).await.is_none() {
            let value = Value::Object(identity.original_data().clone());
            self.storage.write(request, response, value).await?
        } else {
            response
        };
        Ok(PersistenceResult {
            request: request.clone(),
            response,
        })
    }

    async fn clear_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<PersistenceResult, AuthError> {
        let response = self.storage.clear(request, response).await?;
        let mut request = request.clone();
        request.attributes.remove(&self.identity_attribute);
        Ok(PersistenceResult { request, response })
    }
}
