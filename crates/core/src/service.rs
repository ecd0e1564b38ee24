//! The authentication service: runs authenticators in order and keeps the
//! outcome of the last run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{
    AuthData, AuthError, AuthResult, Authenticator, AuthenticatorCollection, Failure,
    PersistenceResult,
};
use crate::http::{AuthRequest, AuthResponse};
use crate::identity::{DefaultIdentityFactory, Identity, IdentityFactory};

/// Options shared by every service instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceOptions {
    /// Where unauthenticated clients are sent, if anywhere.
    #[serde(default)]
    pub unauthenticated_redirect: Option<String>,
    /// Query parameter carrying the originally requested URL.
    #[serde(default)]
    pub query_param: Option<String>,
    /// Request attribute holding the identity after persistence.
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            unauthenticated_redirect: None,
            query_param: None,
            identity_attribute: default_identity_attribute(),
        }
    }
}

fn default_identity_attribute() -> String {
    "identity".to_string()
}

/// Per-request authentication orchestrator.
///
/// Authenticators run in collection order until one returns a valid result.
/// Every authenticator that fails before that is recorded as a [`Failure`];
/// stateless authenticators additionally get to challenge the client, which
/// aborts the run with [`AuthError::Challenge`].
pub struct AuthenticationService {
    authenticators: AuthenticatorCollection,
    identity_factory: Arc<dyn IdentityFactory>,
    options: ServiceOptions,
    successful: Option<Arc<dyn Authenticator>>,
    result: Option<AuthResult>,
    failures: Vec<Failure>,
    identity: Option<Arc<Identity>>,
}

impl AuthenticationService {
    pub fn new(authenticators: AuthenticatorCollection) -> Self {
        Self {
            authenticators,
            identity_factory: Arc::new(DefaultIdentityFactory::new()),
            options: ServiceOptions::default(),
            successful: None,
            result: None,
            failures: Vec::new(),
            identity: None,
        }
    }

    pub fn with_identity_factory(mut self, factory: Arc<dyn IdentityFactory>) -> Self {
        self.identity_factory = factory;
        self
    }

    pub fn with_options(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn authenticators(&self) -> &AuthenticatorCollection {
        &self.authenticators
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Run the authenticators against `request`.
    ///
    /// Returns `Ok(true)` on the first valid result and `Ok(false)` when all
    /// of them failed.
    pub async fn authenticate(&mut self, request: &AuthRequest) -> Result<bool, AuthError> {
        if self.authenticators.is_empty() {
            return Err(AuthError::NoAuthenticators);
        }

        self.identity = None;
        self.result = None;
        self.successful = None;
        self.failures.clear();

        let mut last = None;
        for authenticator in self.authenticators.iter() {
            let result = authenticator.authenticate(request).await;
            if result.is_valid() {
                info!(authenticator = %authenticator.name(), "Authentication succeeded");
                self.successful = Some(authenticator.clone());
                self.result = Some(result);
                return Ok(true);
            }

            debug!(
                authenticator = %authenticator.name(),
                status = %result.status(),
                errors = ?result.errors(),
                "Authenticator failed"
            );
            if let Some(stateless) = authenticator.as_stateless() {
                stateless.unauthorized_challenge(request)?;
            }
            self.failures.push(Failure {
                authenticator: authenticator.clone(),
                result: result.clone(),
            });
            last = Some(result);
        }

        self.result = last;
        Ok(false)
    }

    /// Result of the last run: the valid one, or the last failure.
    pub fn result(&self) -> Option<&AuthResult> {
        self.result.as_ref()
    }

    pub fn successful_authenticator(&self) -> Option<&Arc<dyn Authenticator>> {
        self.successful.as_ref()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Identity of the last valid result, built once and then cached.
    pub fn identity(&mut self) -> Option<Arc<Identity>> {
        if self.identity.is_none() {
            let data = self.result.as_ref().filter(|r| r.is_valid())?.data()?.clone();
            self.identity = Some(self.build_identity(data));
        }
        self.identity.clone()
    }

    /// Build an identity from raw data with this service's factory.
    pub fn build_identity(&self, data: AuthData) -> Arc<Identity> {
        match data {
            AuthData::Identity(identity) => identity,
            AuthData::Record(record) => self.identity_factory.create(record),
        }
    }

    /// Hand `identity` (or the current one) to every persistence-capable
    /// authenticator, threading the response through them in order.
    pub async fn persist_identity(
        &mut self,
        request: &AuthRequest,
        response: AuthResponse,
        identity: Option<Arc<Identity>>,
    ) -> Result<PersistenceResult, AuthError> {
        let Some(identity) = identity.or_else(|| self.identity()) else {
            return Ok(PersistenceResult {
                request: request.clone(),
                response,
            });
        };

        let mut result = PersistenceResult {
            request: request.clone(),
            response,
        };
        for authenticator in self.authenticators.iter() {
            if let Some(persistent) = authenticator.as_persistent() {
                debug!(authenticator = %authenticator.name(), "Persisting identity");
                result = persistent
                    .persist_identity(&result.request, result.response, &identity)
                    .await?;
            }
        }

        result.request.attributes.insert(
            self.options.identity_attribute.clone(),
            serde_json::Value::Object(identity.original_data().clone()),
        );
        Ok(result)
    }

    /// Remove persisted identity state and forget the current identity.
    pub async fn clear_identity(
        &mut self,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<PersistenceResult, AuthError> {
        let mut result = PersistenceResult {
            request: request.clone(),
            response,
        };
        for authenticator in self.authenticators.iter() {
            if let Some(persistent) = authenticator.as_persistent() {
                debug!(authenticator = %authenticator.name(), "Clearing identity");
                result = persistent
                    .clear_identity(&result.request, result.response)
                    .await?;
            }
        }

        result
            .request
            .attributes
            .remove(&self.options.identity_attribute);
        self.identity = None;
        self.result = None;
        self.successful = None;
        Ok(result)
    }

    /// URL to send an unauthenticated client to, carrying the requested
    /// location in `query_param` when configured.
    pub fn unauthenticated_redirect_url(&self, request: &AuthRequest) -> Option<String> {
        let target = self.options.unauthenticated_redirect.as_deref()?;
        let Some(param) = self.options.query_param.as_deref() else {
            return Some(target.to_string());
        };

        let (base, fragment) = match target.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (target, None),
        };
        let separator = if base.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}{}={}",
            base,
            separator,
            urlencoding::encode(param),
            urlencoding::encode(&request.path_and_query())
        );
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        Some(url)
    }

    /// Local redirect target requested through `query_param`, if it is safe.
    pub fn login_redirect(&self, request: &AuthRequest) -> Option<String> {
        let param = self.options.query_param.as_deref()?;
        let target = request.query_param(param)?;
        let local = target.starts_with('/')
            && !target.starts_with("//")
            && !target.starts_with("/\\")
            && !target.contains("://");
        local.then(|| target.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStatus;
    use crate::testing::{fixtures, MockAuthenticator};
    use serde_json::json;

    fn service(authenticators: Vec<Arc<MockAuthenticator>>) -> AuthenticationService {
        AuthenticationService::new(
            authenticators
                .into_iter()
                .map(|a| a as Arc<dyn Authenticator>)
                .collect(),
        )
    }

    fn user() -> crate::identity::Record {
        fixtures::record(json!({"id": 1, "username": "mariano"}))
    }

    #[tokio::test]
    async fn test_no_authenticators() {
        let mut service = AuthenticationService::new(AuthenticatorCollection::new());
        let result = service.authenticate(&AuthRequest::default()).await;
        assert!(matches!(result, Err(AuthError::NoAuthenticators)));
    }

    #[tokio::test]
    async fn test_short_circuits_on_success() {
        let first = Arc::new(MockAuthenticator::failing("first"));
        let second = Arc::new(MockAuthenticator::succeeding("second", user()));
        let third = Arc::new(MockAuthenticator::succeeding("third", user()));
        let mut service = service(vec![first.clone(), second, third.clone()]);

        assert!(service.authenticate(&AuthRequest::default()).await.unwrap());
        assert_eq!(service.successful_authenticator().unwrap().name(), "second");
        assert_eq!(service.failures().len(), 1);
        assert_eq!(service.failures()[0].authenticator.name(), "first");
        assert_eq!(third.authenticate_calls(), 0);
        assert!(service.result().unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_all_fail() {
        let mut service = service(vec![
            Arc::new(MockAuthenticator::failing("first")),
            Arc::new(MockAuthenticator::failing_with(
                "second",
                AuthStatus::FailureIdentityNotFound,
            )),
        ]);
        assert!(!service.authenticate(&AuthRequest::default()).await.unwrap());
        let names: Vec<&str> = service
            .failures()
            .iter()
            .map(|f| f.authenticator.name())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(
            service.result().unwrap().status(),
            AuthStatus::FailureIdentityNotFound
        );
        assert!(service.successful_authenticator().is_none());
        assert!(service.identity().is_none());
    }

    #[tokio::test]
    async fn test_failures_reset_between_runs() {
        let flaky = Arc::new(MockAuthenticator::failing("flaky"));
        let mut service = service(vec![flaky.clone()]);
        service.authenticate(&AuthRequest::default()).await.unwrap();
        assert_eq!(service.failures().len(), 1);

        flaky.set_result(AuthResult::success(user()));
        assert!(service.authenticate(&AuthRequest::default()).await.unwrap());
        assert!(service.failures().is_empty());
    }

    #[tokio::test]
    async fn test_challenge_aborts_iteration() {
        let basic = Arc::new(MockAuthenticator::failing("basic").challenging());
        let after = Arc::new(MockAuthenticator::succeeding("after", user()));
        let mut service = service(vec![basic.clone(), after.clone()]);

        let Err(AuthError::Challenge(challenge)) =
            service.authenticate(&AuthRequest::default()).await
        else {
            panic!("expected a challenge");
        };
        assert_eq!(challenge.status, 401);
        assert_eq!(basic.challenge_calls(), 1);
        assert_eq!(after.authenticate_calls(), 0);
    }

    #[tokio::test]
    async fn test_challenge_drops_previous_result() {
        let basic = Arc::new(MockAuthenticator::succeeding("basic", user()).challenging());
        let mut service = service(vec![basic.clone()]);
        assert!(service.authenticate(&AuthRequest::default()).await.unwrap());
        assert!(service.identity().is_some());

        basic.set_result(AuthResult::failure(
            AuthStatus::FailureCredentialsInvalid,
            Vec::new(),
        ));
        let outcome = service.authenticate(&AuthRequest::default()).await;
        assert!(matches!(outcome, Err(AuthError::Challenge(_))));
        assert!(service.result().is_none());
        assert!(service.successful_authenticator().is_none());
        assert!(service.identity().is_none());
    }

    #[tokio::test]
    async fn test_identity_from_prebuilt_data() {
        let service = service(vec![Arc::new(MockAuthenticator::failing("a"))]);
        let prebuilt = Arc::new(Identity::new(user()));
        let identity = service.build_identity(AuthData::Identity(prebuilt.clone()));
        assert!(Arc::ptr_eq(&identity, &prebuilt));

        let built = service.build_identity(AuthData::Record(user()));
        assert_eq!(built.get("username"), Some(&json!("mariano")));
    }

    #[tokio::test]
    async fn test_noop_challenge_continues() {
        let token = Arc::new(MockAuthenticator::failing("token").stateless());
        let after = Arc::new(MockAuthenticator::succeeding("after", user()));
        let mut service = service(vec![token.clone(), after]);
        assert!(service.authenticate(&AuthRequest::default()).await.unwrap());
        assert_eq!(token.challenge_calls(), 1);
        assert_eq!(service.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_identity_is_cached() {
        let mut service = service(vec![Arc::new(MockAuthenticator::succeeding("a", user()))]);
        service.authenticate(&AuthRequest::default()).await.unwrap();
        let first = service.identity().unwrap();
        let second = service.identity().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("username"), Some(&json!("mariano")));

        service.authenticate(&AuthRequest::default()).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &service.identity().unwrap()));
    }

    #[tokio::test]
    async fn test_persist_threads_response() {
        let session = Arc::new(MockAuthenticator::failing("session").persistent());
        let form = Arc::new(MockAuthenticator::succeeding("form", user()));
        let cookie = Arc::new(MockAuthenticator::failing("cookie").persistent());
        let mut service = service(vec![session.clone(), form, cookie.clone()]);
        service.authenticate(&AuthRequest::default()).await.unwrap();

        let result = service
            .persist_identity(&AuthRequest::default(), AuthResponse::new(), None)
            .await
            .unwrap();
        assert_eq!(
            result.response.header_values("x-persisted-by"),
            vec!["session", "cookie"]
        );
        assert_eq!(session.persisted(), vec![user()]);
        assert_eq!(cookie.persisted(), vec![user()]);
        assert_eq!(result.request.attributes["identity"]["username"], json!("mariano"));
    }

    #[tokio::test]
    async fn test_persist_without_identity_is_passthrough() {
        let session = Arc::new(MockAuthenticator::failing("session").persistent());
        let mut service = service(vec![session.clone()]);
        service.authenticate(&AuthRequest::default()).await.unwrap();

        let result = service
            .persist_identity(&AuthRequest::default(), AuthResponse::new().with_status(204), None)
            .await
            .unwrap();
        assert_eq!(result.response.status, 204);
        assert!(session.persisted().is_empty());

        let explicit = Arc::new(Identity::new(fixtures::record(json!({"id": 9}))));
        service
            .persist_identity(&AuthRequest::default(), AuthResponse::new(), Some(explicit))
            .await
            .unwrap();
        assert_eq!(session.persisted()[0]["id"], json!(9));
    }

    #[tokio::test]
    async fn test_clear_identity() {
        let session = Arc::new(MockAuthenticator::succeeding("session", user()).persistent());
        let mut service = service(vec![session.clone()]);
        service.authenticate(&AuthRequest::default()).await.unwrap();
        assert!(service.identity().is_some());

        let mut request = AuthRequest::default();
        request
            .attributes
            .insert("identity".to_string(), json!({"id": 1}));
        let result = service
            .clear_identity(&request, AuthResponse::new())
            .await
            .unwrap();
        assert_eq!(result.response.header("x-cleared-by"), Some("session"));
        assert!(!result.request.attributes.contains_key("identity"));
        assert_eq!(session.clear_calls(), 1);
        assert!(service.identity().is_none());
        assert!(service.result().is_none());
        assert!(service.successful_authenticator().is_none());
    }

    #[test]
    fn test_unauthenticated_redirect_url() {
        let request = AuthRequest::new("GET", "/secrets").with_query("page=2");
        let service = AuthenticationService::new(AuthenticatorCollection::new());
        assert!(service.unauthenticated_redirect_url(&request).is_none());

        let service = AuthenticationService::new(AuthenticatorCollection::new()).with_options(
            ServiceOptions {
                unauthenticated_redirect: Some("/users/login?lang=en#form".to_string()),
                query_param: Some("redirect".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(
            service.unauthenticated_redirect_url(&request).as_deref(),
            Some("/users/login?lang=en&redirect=%2Fsecrets%3Fpage%3D2#form")
        );
    }

    #[test]
    fn test_login_redirect() {
        let service = AuthenticationService::new(AuthenticatorCollection::new()).with_options(
            ServiceOptions {
                query_param: Some("redirect".to_string()),
                ..Default::default()
            },
        );
        let redirect = |target: &str| {
            service.login_redirect(&AuthRequest::new("POST", "/login").with_query_param("redirect", target))
        };
        assert_eq!(redirect("/articles?page=2").as_deref(), Some("/articles?page=2"));
        assert!(redirect("//evil.example.com").is_none());
        assert!(redirect("https://evil.example.com/").is_none());
        assert!(redirect("articles").is_none());
    }
}
