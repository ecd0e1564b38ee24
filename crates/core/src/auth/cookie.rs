//! "Remember me" cookie authentication.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{
    AuthError, AuthResult, AuthStatus, Authenticator, DefaultUrlChecker, PersistenceAuthenticator,
    PersistenceResult, UrlChecker,
};
use crate::hasher::{DefaultPasswordHasher, PasswordHasher};
use crate::http::{AuthRequest, AuthResponse};
use crate::identifier::{Credentials, Identifier, CREDENTIAL_PASSWORD, CREDENTIAL_USERNAME};
use crate::identity::{Identity, Record};
use crate::storage::{CookieStorage, Storage};

/// Stores `[username, hash(username + password hash + salt)]` in a cookie
/// and authenticates requests presenting it.
pub struct CookieAuthenticator {
    identifier: Arc<dyn Identifier>,
    storage: Arc<dyn Storage>,
    hasher: Arc<dyn PasswordHasher>,
    username_field: String,
    password_field: String,
    remember_me_field: String,
    salt: Option<String>,
    login_url: Vec<String>,
    url_checker: Arc<dyn UrlChecker>,
}

impl CookieAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>) -> Self {
        Self {
            identifier,
            storage: Arc::new(CookieStorage::default()),
            hasher: Arc::new(DefaultPasswordHasher::default()),
            username_field: CREDENTIAL_USERNAME.to_string(),
            password_field: CREDENTIAL_PASSWORD.to_string(),
            remember_me_field: "remember_me".to_string(),
            salt: None,
            login_url: Vec::new(),
            url_checker: Arc::new(DefaultUrlChecker::default()),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_fields(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username_field = username.into();
        self.password_field = password.into();
        self
    }

    pub fn with_remember_me_field(mut self, field: impl Into<String>) -> Self {
        self.remember_me_field = field.into();
        self
    }

    pub fn with_salt(mut self, salt: Option<String>) -> Self {
        self.salt = salt;
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

    fn plain_token(&self, identity: &Record) -> String {
        let field = |name: &str| match identity.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        format!(
            "{}{}{}",
            field(&self.username_field),
            field(&self.password_field),
            self.salt.as_deref().unwrap_or_default()
        )
    }

    /// Build the JSON token persisted for `identity`.
    pub fn create_token(&self, identity: &Record) -> Result<Value, AuthError> {
        let username = identity
            .get(&self.username_field)
            .cloned()
            .unwrap_or(Value::Null);
        let hash = self.hasher.hash(&self.plain_token(identity))?;
        Ok(json!([username, hash]))
    }

    fn remember_me(&self, request: &AuthRequest) -> bool {
        match request.body_value(&self.remember_me_field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Null) | None => false,
        }
    }
}

#[async_trait]
impl Authenticator for CookieAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let Some(stored) = self.storage.read(request).await else {
            return AuthResult::failure(
                AuthStatus::FailureCredentialsMissing,
                vec!["Login credentials not found".to_string()],
            );
        };

        let token = match stored {
            Value::Array(items) => match items.as_slice() {
                [Value::String(username), Value::String(hash)] => {
                    Some((username.clone(), hash.clone()))
                }
                _ => None,
            },
            _ => None,
        };
        let Some((username, token_hash)) = token else {
            return AuthResult::failure(
                AuthStatus::FailureCredentialsInvalid,
                vec!["Cookie token is invalid.".to_string()],
            );
        };

        let credentials = Credentials::new().with(CREDENTIAL_USERNAME, username.as_str());
        let identification = self.identifier.identify(&credentials).await;
        let Some(identity) = identification.record else {
            return AuthResult::failure(AuthStatus::FailureIdentityNotFound, identification.errors);
        };

        if !self.hasher.check(&self.plain_token(&identity), &token_hash) {
            debug!(username = %username, "Cookie token mismatch");
            return AuthResult::failure(
                AuthStatus::FailureCredentialsInvalid,
                vec!["Cookie token does not match".to_string()],
            );
        }
        AuthResult::success(identity)
    }

    fn name(&self) -> &str {
        "cookie"
    }

    fn as_persistent(&self) -> Option<&dyn PersistenceAuthenticator> {
        Some(self)
    }
}

#[async_trait]
impl PersistenceAuthenticator for CookieAuthenticator {
    async fn persist_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
        identity: &Identity,
    ) -> Result<PersistenceResult, AuthError> {
        if !self.url_checker.check(request, &self.login_url) || !self.remember_me(request) {
            debug!(url = %self.url_checker.url_to_check(request), "Remember-me not requested");
            return Ok(PersistenceResult {
                request: request.clone(),
                response,
            });
        }

        let token = self.create_token(identity.original_data())?;
        let response = self.storage.write(request, response, token).await?;
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
        Ok(PersistenceResult {
            request: request.clone(),
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::parse_set_cookie;
    use crate::testing::{fixtures, MockStorage};

    fn authenticator(storage: Arc<dyn Storage>) -> CookieAuthenticator {
        CookieAuthenticator::new(fixtures::password_identifier())
            .with_storage(storage)
            .with_hasher(Arc::new(fixtures::hasher()))
            .with_salt(Some("salt".to_string()))
    }

    fn mariano() -> Record {
        fixtures::user_records()
            .into_iter()
            .find(|user| user["username"] == "mariano")
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token() {
        let storage = Arc::new(MockStorage::new());
        let authenticator = authenticator(storage.clone());
        storage.set(Some(authenticator.create_token(&mariano()).unwrap()));

        let result = authenticator.authenticate(&AuthRequest::default()).await;
        assert!(result.is_valid());
        assert_eq!(result.data().unwrap().record()["id"], json!(1));
    }

    #[tokio::test]
    async fn test_missing_cookie() {
        let authenticator = authenticator(Arc::new(MockStorage::new()));
        let result = authenticator.authenticate(&AuthRequest::default()).await;
        assert_eq!(result.status(), AuthStatus::FailureCredentialsMissing);
    }

    #[tokio::test]
    async fn test_malformed_token() {
        for stored in [
            json!(["mariano", "hash", "extra"]),
            json!(["mariano"]),
            json!("mariano"),
            json!(["mariano", 5]),
        ] {
            let storage = Arc::new(MockStorage::new());
            storage.set(Some(stored));
            let result = authenticator(storage).authenticate(&AuthRequest::default()).await;
            assert_eq!(result.status(), AuthStatus::FailureCredentialsInvalid);
            assert_eq!(result.errors(), ["Cookie token is invalid.".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_unknown_user_and_bad_hash() {
        let storage = Arc::new(MockStorage::new());
        storage.set(Some(json!(["nobody", "hash"])));
        let result = authenticator(storage.clone())
            .authenticate(&AuthRequest::default())
            .await;
        assert_eq!(result.status(), AuthStatus::FailureIdentityNotFound);

        storage.set(Some(json!(["mariano", "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$AAAA"])));
        let result = authenticator(storage)
            .authenticate(&AuthRequest::default())
            .await;
        assert_eq!(result.status(), AuthStatus::FailureCredentialsInvalid);
        assert_eq!(result.errors(), ["Cookie token does not match".to_string()]);
    }

    #[tokio::test]
    async fn test_persist_requires_remember_me() {
        let authenticator = CookieAuthenticator::new(fixtures::password_identifier())
            .with_hasher(Arc::new(fixtures::hasher()));
        let identity = Identity::new(mariano());

        let request = AuthRequest::new("POST", "/login").with_body(json!({"remember_me": false}));
        let result = authenticator
            .persist_identity(&request, AuthResponse::new(), &identity)
            .await
            .unwrap();
        assert!(result.response.header("set-cookie").is_none());

        let request = AuthRequest::new("POST", "/login").with_body(json!({"remember_me": "1"}));
        let result = authenticator
            .persist_identity(&request, AuthResponse::new(), &identity)
            .await
            .unwrap();
        let (name, value) = parse_set_cookie(result.response.header("set-cookie").unwrap()).unwrap();
        assert_eq!(name, "CookieAuth");

        let next = AuthRequest::default().with_cookie(&name, &value);
        let result = authenticator.authenticate(&next).await;
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn test_persist_checks_login_url() {
        let storage = Arc::new(MockStorage::new());
        let authenticator = authenticator(storage.clone()).with_login_url(vec!["/login".to_string()]);
        let identity = Identity::new(mariano());

        let request = AuthRequest::new("POST", "/other").with_body(json!({"remember_me": true}));
        authenticator
            .persist_identity(&request, AuthResponse::new(), &identity)
            .await
            .unwrap();
        assert!(storage.get().is_none());

        let request = AuthRequest::new("POST", "/login").with_body(json!({"remember_me": true}));
        authenticator
            .persist_identity(&request, AuthResponse::new(), &identity)
            .await
            .unwrap();
        let stored = storage.get().unwrap();
        assert_eq!(stored[0], json!("mariano"));
        let password_hash = mariano()["password"].as_str().unwrap().to_string();
        assert!(fixtures::hasher().check(
            &format!("mariano{password_hash}salt"),
            stored[1].as_str().unwrap()
        ));
    }

    #[tokio::test]
    async fn test_clear_expires_cookie() {
        let authenticator = CookieAuthenticator::new(fixtures::password_identifier());
        let result = authenticator
            .clear_identity(&AuthRequest::default(), AuthResponse::new())
            .await
            .unwrap();
        assert!(result
            .response
            .header("set-cookie")
            .unwrap()
            .contains("max-age=0"));
    }
}
