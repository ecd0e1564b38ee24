//! Persistence of authentication state between requests.

mod cookie;
mod session;

pub use cookie::{CookieOptions, CookieStorage};
pub use session::SessionStorage;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::http::{AuthRequest, AuthResponse};
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No session is attached to the request")]
    NoSession,

    #[error("Failed to encode stored value: {0}")]
    Encode(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Reads and writes the value an authenticator persists for a client.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, request: &AuthRequest) -> Option<Value>;

    async fn write(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
        value: Value,
    ) -> Result<AuthResponse, StorageError>;

    async fn clear(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, StorageError>;
}
