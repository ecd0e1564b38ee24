use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::{AuthError, Authenticator};
use crate::http::{AuthRequest, AuthResponse};
use crate::identifier::Identification;
use crate::identity::{Identity, Record};

/// Outcome category of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    Success,
    FailureIdentityNotFound,
    FailureCredentialsInvalid,
    FailureCredentialsMissing,
    FailureOther,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::FailureIdentityNotFound => "FAILURE_IDENTITY_NOT_FOUND",
            Self::FailureCredentialsInvalid => "FAILURE_CREDENTIALS_INVALID",
            Self::FailureCredentialsMissing => "FAILURE_CREDENTIALS_MISSING",
            Self::FailureOther => "FAILURE_OTHER",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal data carried by a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthData {
    Record(Record),
    Identity(Arc<Identity>),
}

impl AuthData {
    /// The underlying principal record.
    pub fn record(&self) -> &Record {
        match self {
            Self::Record(record) => record,
            Self::Identity(identity) => identity.original_data(),
        }
    }
}

impl From<Record> for AuthData {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Arc<Identity>> for AuthData {
    fn from(identity: Arc<Identity>) -> Self {
        Self::Identity(identity)
    }
}

/// Immutable outcome of one authenticator run.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult {
    status: AuthStatus,
    data: Option<AuthData>,
    errors: Vec<String>,
    needs_password_rehash: bool,
}

impl AuthResult {
    /// Build a result; a successful result must carry data.
    pub fn new(
        status: AuthStatus,
        data: Option<AuthData>,
        errors: Vec<String>,
    ) -> Result<Self, AuthError> {
        if status == AuthStatus::Success && data.is_none() {
            return Err(AuthError::InvalidArgument(
                "Identity data can not be empty with status success.".to_string(),
            ));
        }
        Ok(Self {
            status,
            data,
            errors,
            needs_password_rehash: false,
        })
    }

    pub fn success(data: impl Into<AuthData>) -> Self {
        Self {
            status: AuthStatus::Success,
            data: Some(data.into()),
            errors: Vec::new(),
            needs_password_rehash: false,
        }
    }

    /// A failed result without data. `status` must be one of the failure statuses.
    pub fn failure(status: AuthStatus, errors: Vec<String>) -> Self {
        debug_assert!(status != AuthStatus::Success);
        Self {
            status,
            data: None,
            errors,
            needs_password_rehash: false,
        }
    }

    /// Success when `identification` found a record, otherwise a failure
    /// with `status` and the identifier's diagnostics.
    pub fn from_identification(identification: Identification, status: AuthStatus) -> Self {
        let Identification {
            record,
            errors,
            needs_rehash,
        } = identification;
        match record {
            Some(record) => Self {
                needs_password_rehash: needs_rehash,
                errors,
                ..Self::success(record)
            },
            None => Self::failure(status, errors),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == AuthStatus::Success
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn data(&self) -> Option<&AuthData> {
        self.data.as_ref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The password verified against a hash that should be regenerated.
    pub fn needs_password_rehash(&self) -> bool {
        self.needs_password_rehash
    }
}

/// A non-valid result together with the authenticator that produced it.
#[derive(Clone)]
pub struct Failure {
    pub authenticator: Arc<dyn Authenticator>,
    pub result: AuthResult,
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("authenticator", &self.authenticator.name())
            .field("result", &self.result)
            .finish()
    }
}

/// Response a stateless authenticator asks the client to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Challenge {
    pub fn unauthorized(headers: Vec<(String, String)>) -> Self {
        Self {
            status: 401,
            headers,
            body: String::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Request and response after identity persistence or clearing.
#[derive(Debug, Clone)]
pub struct PersistenceResult {
    pub request: AuthRequest,
    pub response: AuthResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        json!({"id": 1}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_success_requires_data() {
        let result = AuthResult::new(AuthStatus::Success, None, vec![]);
        assert!(matches!(result, Err(AuthError::InvalidArgument(_))));

        let result =
            AuthResult::new(AuthStatus::Success, Some(record().into()), vec![]).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.data().unwrap().record(), &record());
    }

    #[test]
    fn test_failure_without_data() {
        let result = AuthResult::new(
            AuthStatus::FailureIdentityNotFound,
            None,
            vec!["not found".to_string()],
        )
        .unwrap();
        assert!(!result.is_valid());
        assert!(result.data().is_none());
        assert_eq!(result.errors(), ["not found".to_string()]);
    }

    #[test]
    fn test_from_identification() {
        let found = Identification {
            needs_rehash: true,
            ..Identification::found(record())
        };
        let result = AuthResult::from_identification(found, AuthStatus::FailureIdentityNotFound);
        assert!(result.is_valid());
        assert!(result.needs_password_rehash());

        let missed = Identification::failed(vec!["lookup failed".to_string()]);
        let result = AuthResult::from_identification(missed, AuthStatus::FailureCredentialsInvalid);
        assert_eq!(result.status(), AuthStatus::FailureCredentialsInvalid);
        assert_eq!(result.errors(), ["lookup failed".to_string()]);
        assert!(!result.needs_password_rehash());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(AuthStatus::Success.as_str(), "SUCCESS");
        assert_eq!(
            AuthStatus::FailureCredentialsMissing.to_string(),
            "FAILURE_CREDENTIALS_MISSING"
        );
        assert_eq!(
            serde_json::to_value(AuthStatus::FailureOther).unwrap(),
            json!("FAILURE_OTHER")
        );
    }

    #[test]
    fn test_challenge_header_lookup() {
        let challenge = Challenge::unauthorized(vec![(
            "WWW-Authenticate".to_string(),
            "Basic realm=\"x\"".to_string(),
        )]);
        assert_eq!(challenge.status, 401);
        assert_eq!(challenge.header("www-authenticate"), Some("Basic realm=\"x\""));
    }
}
