//! Opaque token authentication.

use async_trait::async_trait;
use std::sync::Arc;

use super::{AuthError, AuthResult, AuthStatus, Authenticator, StatelessAuthenticator};
use crate::http::AuthRequest;
use crate::identifier::{Credentials, Identifier, CREDENTIAL_TOKEN};

/// Where a token is read from. The header wins over the query parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSource {
    pub header: Option<String>,
    pub query_param: Option<String>,
    /// Scheme stripped from the value, compared case-insensitively.
    pub token_prefix: Option<String>,
}

impl TokenSource {
    pub fn token(&self, request: &AuthRequest) -> Option<String> {
        let from_header = self
            .header
            .as_deref()
            .and_then(|name| request.header(name))
            .filter(|value| !value.is_empty())
            .map(|value| self.strip_prefix(value));
        if let Some(token) = from_header.filter(|token| !token.is_empty()) {
            return Some(token);
        }

        self.query_param
            .as_deref()
            .and_then(|name| request.query_param(name))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn strip_prefix(&self, value: &str) -> String {
        let value = value.trim();
        let Some(prefix) = self.token_prefix.as_deref().filter(|p| !p.is_empty()) else {
            return value.to_string();
        };
        let prefix = format!("{} ", prefix);
        match value.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(&prefix) => value[prefix.len()..].trim().to_string(),
            _ => value.to_string(),
        }
    }
}

pub struct TokenAuthenticator {
    identifier: Arc<dyn Identifier>,
    source: TokenSource,
}

impl TokenAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>, source: TokenSource) -> Self {
        Self { identifier, source }
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let Some(token) = self.source.token(request) else {
            return AuthResult::failure(AuthStatus::FailureCredentialsMissing, Vec::new());
        };

        let credentials = Credentials::new().with(CREDENTIAL_TOKEN, token);
        let identification = self.identifier.identify(&credentials).await;
        AuthResult::from_identification(identification, AuthStatus::FailureIdentityNotFound)
    }

    fn name(&self) -> &str {
        "token"
    }

    fn as_stateless(&self) -> Option<&dyn StatelessAuthenticator> {
        Some(self)
    }
}

impl StatelessAuthenticator for TokenAuthenticator {
    /// Tokens have no negotiation step.
    fn unauthorized_challenge(&self, _request: &AuthRequest) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use serde_json::json;

    fn source() -> TokenSource {
        TokenSource {
            header: Some("Token".to_string()),
            query_param: Some("token".to_string()),
            token_prefix: Some("bearer".to_string()),
        }
    }

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new(fixtures::token_identifier(), source())
    }

    #[tokio::test]
    async fn test_token_from_header() {
        let request = AuthRequest::default().with_header("Token", "Bearer  token-1 ");
        let result = authenticator().authenticate(&request).await;
        assert!(result.is_valid());
        assert_eq!(result.data().unwrap().record()["username"], json!("mariano"));
    }

    #[tokio::test]
    async fn test_token_from_query() {
        let request = AuthRequest::default().with_query_param("token", "token-2");
        let result = authenticator().authenticate(&request).await;
        assert_eq!(result.data().unwrap().record()["username"], json!("robert"));
    }

    #[tokio::test]
    async fn test_missing_and_unknown_token() {
        let result = authenticator().authenticate(&AuthRequest::default()).await;
        assert_eq!(result.status(), AuthStatus::FailureCredentialsMissing);

        let request = AuthRequest::default().with_header("Token", "BEARER nope");
        let result = authenticator().authenticate(&request).await;
        assert_eq!(result.status(), AuthStatus::FailureIdentityNotFound);
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        let source = source();
        let request = AuthRequest::default().with_header("Token", "bEaReR abc");
        assert_eq!(source.token(&request).as_deref(), Some("abc"));

        let request = AuthRequest::default().with_header("Token", "abc");
        assert_eq!(source.token(&request).as_deref(), Some("abc"));
    }

    #[test]
    fn test_challenge_is_noop() {
        assert!(authenticator()
            .unauthorized_challenge(&AuthRequest::default())
            .is_ok());
    }
}
