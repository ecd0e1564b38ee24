//! Mock storage for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

use crate::http::{AuthRequest, AuthResponse};
use crate::storage::{Storage, StorageError};

/// In-memory [`Storage`] holding a single value regardless of the request.
#[derive(Debug, Default)]
pub struct MockStorage {
    value: Mutex<Option<Value>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: Option<Value>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn get(&self) -> Option<Value> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn read(&self, _request: &AuthRequest) -> Option<Value> {
        self.get()
    }

    async fn write(
        &self,
        _request: &AuthRequest,
        response: AuthResponse,
        value: Value,
    ) -> Result<AuthResponse, StorageError> {
        self.set(Some(value));
        Ok(response)
    }

    async fn clear(
        &self,
        _request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, StorageError> {
        self.set(None);
        Ok(response)
    }
}
