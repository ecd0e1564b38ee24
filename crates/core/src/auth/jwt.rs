//! JSON Web Token authentication.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::token::TokenSource;
use super::{AuthError, AuthResult, AuthStatus, Authenticator, StatelessAuthenticator};
use crate::http::AuthRequest;
use crate::identifier::{Credentials, Identifier, CREDENTIAL_JWT_SUBJECT};

/// Settings for [`JwtAuthenticator`].
#[derive(Debug, Clone)]
pub struct JwtOptions {
    pub secret: String,
    pub algorithms: Vec<String>,
    pub source: TokenSource,
    /// Claim holding the principal id.
    pub subject_key: String,
    /// Use the token payload as identity instead of resolving the subject.
    pub return_payload: bool,
}

impl JwtOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithms: vec!["HS256".to_string()],
            source: TokenSource {
                header: Some("authorization".to_string()),
                query_param: Some("token".to_string()),
                token_prefix: Some("bearer".to_string()),
            },
            subject_key: CREDENTIAL_JWT_SUBJECT.to_string(),
            return_payload: true,
        }
    }
}

pub struct JwtAuthenticator {
    identifier: Arc<dyn Identifier>,
    source: TokenSource,
    subject_key: String,
    return_payload: bool,
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>, options: JwtOptions) -> Result<Self, AuthError> {
        if options.secret.is_empty() {
            return Err(AuthError::Configuration(
                "jwt requires a non-empty secret".to_string(),
            ));
        }
        let algorithms = parse_algorithms(&options.algorithms)?;

        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms;
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Ok(Self {
            identifier,
            source: options.source,
            subject_key: options.subject_key,
            return_payload: options.return_payload,
            key: DecodingKey::from_secret(options.secret.as_bytes()),
            validation,
        })
    }

    /// Decode and verify the token carried by `request`.
    pub fn payload(&self, request: &AuthRequest) -> Option<Result<Value, String>> {
        let token = self.source.token(request)?;
        Some(
            decode::<Value>(&token, &self.key, &self.validation)
                .map(|data| data.claims)
                .map_err(|e| e.to_string()),
        )
    }
}

/// Parse algorithm names, accepting only HMAC variants.
pub fn parse_algorithms(names: &[String]) -> Result<Vec<Algorithm>, AuthError> {
    if names.is_empty() {
        return Err(AuthError::Configuration(
            "jwt requires at least one algorithm".to_string(),
        ));
    }
    names
        .iter()
        .map(|name| match Algorithm::from_str(name) {
            Ok(algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => {
                Ok(algorithm)
            }
            _ => Err(AuthError::Configuration(format!(
                "unsupported jwt algorithm: {name}"
            ))),
        })
        .collect()
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let payload = match self.payload(request) {
            None => {
                return AuthResult::failure(AuthStatus::FailureCredentialsMissing, Vec::new())
            }
            Some(Err(e)) => {
                debug!(error = %e, "JWT rejected");
                return AuthResult::failure(AuthStatus::FailureCredentialsInvalid, vec![e]);
            }
            Some(Ok(payload)) => payload,
        };
        let Value::Object(claims) = payload else {
            return AuthResult::failure(AuthStatus::FailureCredentialsInvalid, Vec::new());
        };

        let subject = match claims.get(&self.subject_key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return AuthResult::failure(AuthStatus::FailureCredentialsMissing, Vec::new())
            }
        };

        if self.return_payload {
            return AuthResult::success(claims);
        }

        let credentials = Credentials::new().with(self.subject_key.as_str(), subject);
        let identification = self.identifier.identify(&credentials).await;
        AuthResult::from_identification(identification, AuthStatus::FailureIdentityNotFound)
    }

    fn name(&self) -> &str {
        "jwt"
    }

    fn as_stateless(&self) -> Option<&dyn StatelessAuthenticator> {
        Some(self)
    }
}

impl StatelessAuthenticator for JwtAuthenticator {
    fn unauthorized_challenge(&self, _request: &AuthRequest) -> Result<(), AuthError> {
        Ok(())
    }
}
