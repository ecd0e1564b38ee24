//! Mock authenticator for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::auth::{
    AuthError, AuthResult, AuthStatus, Authenticator, Challenge, PersistenceAuthenticator,
    PersistenceResult, StatelessAuthenticator,
};
use crate::http::{AuthRequest, AuthResponse};
use crate::identity::{Identity, Record};

#[derive(Debug, Clone)]
enum StatelessMode {
    NoOp,
    Challenge(Challenge),
}

/// Mock implementation of the Authenticator trait.
///
/// Provides controllable behavior for testing:
/// - Fixed result returned by every `authenticate` call
/// - Optional stateless capability (no-op or challenging)
/// - Optional persistence capability recording persisted identities
/// - Call counters for assertions
///
/// Persisting adds an `x-persisted-by: <name>` header and clearing adds
/// `x-cleared-by: <name>`, so tests can see how responses are threaded.
///
/// # Example
///
/// ```rust,ignore
/// use gatehouse_core::testing::MockAuthenticator;
///
/// let auth = MockAuthenticator::failing("basic").challenging();
/// let result = auth.authenticate(&request).await;
/// assert_eq!(auth.authenticate_calls(), 1);
/// ```
#[derive(Debug)]
pub struct MockAuthenticator {
    name: String,
    result: Mutex<AuthResult>,
    stateless: Option<StatelessMode>,
    persistent: bool,
    authenticate_calls: AtomicUsize,
    challenge_calls: AtomicUsize,
    clear_calls: AtomicUsize,
    persisted: Mutex<Vec<Record>>,
}

impl MockAuthenticator {
    fn with_result(name: &str, result: AuthResult) -> Self {
        Self {
            name: name.to_string(),
            result: Mutex::new(result),
            stateless: None,
            persistent: false,
            authenticate_calls: AtomicUsize::new(0),
            challenge_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            persisted: Mutex::new(Vec::new()),
        }
    }

    /// Authenticator that always succeeds with `record`.
    pub fn succeeding(name: &str, record: Record) -> Self {
        Self::with_result(name, AuthResult::success(record))
    }

    /// Authenticator that always fails with `FailureCredentialsMissing`.
    pub fn failing(name: &str) -> Self {
        Self::failing_with(name, AuthStatus::FailureCredentialsMissing)
    }

    pub fn failing_with(name: &str, status: AuthStatus) -> Self {
        Self::with_result(name, AuthResult::failure(status, vec![format!("{name} failed")]))
    }

    /// Expose a stateless capability whose challenge does nothing.
    pub fn stateless(mut self) -> Self {
        self.stateless = Some(StatelessMode::NoOp);
        self
    }

    /// Expose a stateless capability that always challenges with a 401.
    pub fn challenging(mut self) -> Self {
        self.stateless = Some(StatelessMode::Challenge(Challenge::unauthorized(vec![(
            "WWW-Authenticate".to_string(),
            format!("Mock realm=\"{}\"", self.name),
        )])));
        self
    }

    /// Expose a persistence capability.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Replace the result returned from now on.
    pub fn set_result(&self, result: AuthResult) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = result;
    }

    pub fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    pub fn challenge_calls(&self) -> usize {
        self.challenge_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    /// Identities passed to `persist_identity`, in call order.
    pub fn persisted(&self) -> Vec<Record> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> AuthResult {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_stateless(&self) -> Option<&dyn StatelessAuthenticator> {
        self.stateless.as_ref().map(|_| self as &dyn StatelessAuthenticator)
    }

    fn as_persistent(&self) -> Option<&dyn PersistenceAuthenticator> {
        self.persistent
            .then_some(self as &dyn PersistenceAuthenticator)
    }
}

impl StatelessAuthenticator for MockAuthenticator {
    fn unauthorized_challenge(&self, _request: &AuthRequest) -> Result<(), AuthError> {
        self.challenge_calls.fetch_add(1, Ordering::SeqCst);
        match &self.stateless {
            Some(StatelessMode::Challenge(challenge)) => Err(AuthError::Challenge(challenge.clone())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceAuthenticator for MockAuthenticator {
    async fn persist_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
        identity: &Identity,
    ) -> Result<PersistenceResult, AuthError> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(identity.original_data().clone());
        Ok(PersistenceResult {
            request: request.clone(),
            response: response.with_added_header("x-persisted-by", self.name.clone()),
        })
    }

    async fn clear_identity(
        &self,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<PersistenceResult, AuthError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PersistenceResult {
            request: request.clone(),
            response: response.with_added_header("x-cleared-by", self.name.clone()),
        })
    }
}
