//! HTTP Basic authentication.

use async_trait::async_trait;
use std::sync::Arc;

use super::{
    AuthError, AuthResult, AuthStatus, Authenticator, Challenge, StatelessAuthenticator,
};
use crate::http::{AuthRequest, SERVER_AUTH_PW, SERVER_AUTH_USER, SERVER_NAME};
use crate::identifier::{Credentials, Identifier, CREDENTIAL_PASSWORD, CREDENTIAL_USERNAME};

/// Authenticates the user/password pair decoded from an
/// `Authorization: Basic` header into the `AUTH_USER`/`AUTH_PW` server
/// variables.
pub struct HttpBasicAuthenticator {
    identifier: Arc<dyn Identifier>,
    realm: Option<String>,
}

impl HttpBasicAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>) -> Self {
        Self {
            identifier,
            realm: None,
        }
    }

    /// Realm announced in the challenge; defaults to the `SERVER_NAME` variable.
    pub fn with_realm(mut self, realm: Option<String>) -> Self {
        self.realm = realm;
        self
    }

    fn realm(&self, request: &AuthRequest) -> String {
        self.realm
            .clone()
            .or_else(|| request.server_var(SERVER_NAME).map(str::to_string))
            .unwrap_or_default()
    }
}

#[async_trait]
impl Authenticator for HttpBasicAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let username = request.server_var(SERVER_AUTH_USER).filter(|v| !v.is_empty());
        let password = request.server_var(SERVER_AUTH_PW).filter(|v| !v.is_empty());
        let (Some(username), Some(password)) = (username, password) else {
            return AuthResult::failure(AuthStatus::FailureCredentialsMissing, Vec::new());
        };

        let credentials = Credentials::new()
            .with(CREDENTIAL_USERNAME, username)
            .with(CREDENTIAL_PASSWORD, password);
        let identification = self.identifier.identify(&credentials).await;
        AuthResult::from_identification(identification, AuthStatus::FailureIdentityNotFound)
    }

    fn name(&self) -> &str {
        "http_basic"
    }

    fn as_stateless(&self) -> Option<&dyn StatelessAuthenticator> {
        Some(self)
    }
}

impl StatelessAuthenticator for HttpBasicAuthenticator {
    fn unauthorized_challenge(&self, request: &AuthRequest) -> Result<(), AuthError> {
        let header = format!("Basic realm=\"{}\"", self.realm(request));
        Err(AuthError::Challenge(Challenge::unauthorized(vec![(
            "WWW-Authenticate".to_string(),
            header,
        )])))
    }
}
