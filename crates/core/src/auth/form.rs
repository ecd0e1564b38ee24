//! Login form authentication.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::url_checker::login_url_mismatch;
use super::{AuthResult, AuthStatus, Authenticator, DefaultUrlChecker, UrlChecker};
use crate::http::AuthRequest;
use crate::identifier::{Credentials, Identifier, CREDENTIAL_PASSWORD, CREDENTIAL_USERNAME};

/// Reads credentials from the parsed request body.
///
/// Each credential key is mapped to a body field; dotted paths such as
/// `user.email` reach into nested objects.
pub struct FormAuthenticator {
    identifier: Arc<dyn Identifier>,
    fields: Vec<(String, String)>,
    login_url: Vec<String>,
    url_checker: Arc<dyn UrlChecker>,
}

impl FormAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>) -> Self {
        Self {
            identifier,
            fields: vec![
                (CREDENTIAL_USERNAME.to_string(), CREDENTIAL_USERNAME.to_string()),
                (CREDENTIAL_PASSWORD.to_string(), CREDENTIAL_PASSWORD.to_string()),
            ],
            login_url: Vec::new(),
            url_checker: Arc::new(DefaultUrlChecker::default()),
        }
    }

    /// Map credential keys to body fields.
    pub fn with_fields(mut self, fields: Vec<(String, String)>) -> Self {
        self.fields = fields;
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
        for (key, field) in &self.fields {
            match request.body_value(field) {
                Some(Value::String(value)) if !value.is_empty() => {
                    credentials.insert(key.as_str(), value.as_str());
                }
                _ => return None,
            }
        }
        Some(credentials)
    }
}

#[async_trait]
impl Authenticator for FormAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        if !self.url_checker.check(request, &self.login_url) {
            let checked = self.url_checker.url_to_check(request);
            debug!(url = %checked, "Form login URL did not match");
            return AuthResult::failure(
                AuthStatus::FailureOther,
                vec![login_url_mismatch(&checked, &self.login_url)],
            );
        }

        let Some(credentials) = self.credentials(request) else {
            return AuthResult::failure(
                AuthStatus::FailureCredentialsMissing,
                vec!["Login credentials not found".to_string()],
            );
        };

        let identification = self.identifier.identify(&credentials).await;
        AuthResult::from_identification(identification, AuthStatus::FailureIdentityNotFound)
    }

    fn name(&self) -> &str {
        "form"
    }
}
