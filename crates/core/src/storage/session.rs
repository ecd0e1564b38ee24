use async_trait::async_trait;
use serde_json::Value;

use super::{Storage, StorageError};
use crate::http::{AuthRequest, AuthResponse};

/// Stores a value under a key of the request's [`Session`](crate::Session).
///
/// Writing and clearing both renew the session id.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    key: String,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new("Auth")
    }
}

impl SessionStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl Storage for SessionStorage {
    async fn read(&self, request: &AuthRequest) -> Option<Value> {
        request
            .session()?
            .read(&self.key)
            .filter(|value| !value.is_null())
    }

    async fn write(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
        value: Value,
    ) -> Result<AuthResponse, StorageError> {
        let session = request.session().ok_or(StorageError::NoSession)?;
        session.renew();
        session.write(&self.key, value);
        Ok(response)
    }

    async fn clear(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, StorageError> {
        let session = request.session().ok_or(StorageError::NoSession)?;
        session.delete(&self.key);
        session.renew();
        Ok(response)
    }
}
