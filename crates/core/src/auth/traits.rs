use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthResult, Challenge, PersistenceResult};
use crate::hasher::HasherError;
use crate::http::{AuthRequest, AuthResponse};
use crate::identity::Identity;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No authenticators loaded. You need to load at least one authenticator.")]
    NoAuthenticators,

    #[error("Authentication challenge issued (status {})", .0.status)]
    Challenge(Challenge),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Identity does not allow wrapped data to be modified: {0}")]
    ImmutableIdentity(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Hasher(#[from] HasherError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// One authentication strategy.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Try to authenticate `request`. Credential problems are reported in
    /// the result, never as errors.
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult;

    /// Name of this authentication method
    fn name(&self) -> &str;

    fn as_stateless(&self) -> Option<&dyn StatelessAuthenticator> {
        None
    }

    fn as_persistent(&self) -> Option<&dyn PersistenceAuthenticator> {
        None
    }
}

/// Authenticators that expect credentials on every request.
pub trait StatelessAuthenticator: Send + Sync {
    /// Returns `Err(AuthError::Challenge)` when the client must be asked
    /// for credentials.
    fn unauthorized_challenge(&self, request: &AuthRequest) -> Result<(), AuthError>;
}

/// Authenticators that can remember an identity across requests.
#[async_trait]
pub trait PersistenceAuthenticator: Send + Sync {
    async fn persist_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
        identity: &Identity,
    ) -> Result<PersistenceResult, AuthError>;

    async fn clear_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<PersistenceResult, AuthError>;
}
