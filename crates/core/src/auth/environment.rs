//! Authentication from server variables set by an upstream component
//! (e.g. a reverse proxy that already verified a client certificate).

use async_trait::async_trait;
use std::sync::Arc;

use super::url_checker::login_url_mismatch;
use super::{AuthResult, AuthStatus, Authenticator, DefaultUrlChecker, UrlChecker};
use crate::http::AuthRequest;
use crate::identifier::{Credentials, Identifier};

pub struct EnvironmentAuthenticator {
    identifier: Arc<dyn Identifier>,
    fields: Vec<String>,
    optional_fields: Vec<String>,
    login_url: Vec<String>,
    url_checker: Arc<dyn UrlChecker>,
}

impl EnvironmentAuthenticator {
    /// `fields` are the server variables that must all be present and non-empty.
    pub fn new(identifier: Arc<dyn Identifier>, fields: Vec<String>) -> Self {
        Self {
            identifier,
            fields,
            optional_fields: Vec::new(),
            login_url: Vec::new(),
            url_checker: Arc::new(DefaultUrlChecker::default()),
        }
    }

    pub fn with_optional_fields(mut self, fields: Vec<String>) -> Self {
        self.optional_fields = fields;
        self
    }

    pub fn with_login_url(mut self, urls: Vec<String>) -> Self {
        self.login_url = urls;
        self
    }

    pub fn with_url_checker(mut self, checker: Arc<dyn UrlChecker>) -> Self {
        self.url_checker = checker;
        self
    }

    fn credentials(&self, request: &AuthRequest) -> Option<Credentials> {
        let mut credentials = Credentials::new();
        for field in &self.fields {
            let value = request.server_var(field).filter(|v| !v.is_empty())?;
            credentials.insert(field.as_str(), value);
        }
        for field in &self.optional_fields {
            if let Some(value) = request.server_var(field).filter(|v| !v.is_empty()) {
                credentials.insert(field.as_str(), value);
            }
        }
        Some(credentials)
    }
}

#[async_trait]
impl Authenticator for EnvironmentAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        if !self.url_checker.check(request, &self.login_url) {
            let checked = self.url_checker.url_to_check(request);
            return AuthResult::failure(
                AuthStatus::FailureOther,
                vec![login_url_mismatch(&checked, &self.login_url)],
            );
        }

        let Some(credentials) = self.credentials(request) else {
            return AuthResult::failure(
                AuthStatus::FailureCredentialsMissing,
                vec!["Environment credentials not found".to_string()],
            );
        };

        let identification = self.identifier.identify(&credentials).await;
        AuthResult::from_identification(identification, AuthStatus::FailureIdentityNotFound)
    }

    fn name(&self) -> &str {
        "environment"
    }
}
