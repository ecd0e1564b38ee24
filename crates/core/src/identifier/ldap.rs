use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::{Credentials, Identification, Identifier, CREDENTIAL_PASSWORD, CREDENTIAL_USERNAME};
use crate::identity::Record;

#[derive(Debug, Error)]
pub enum LdapError {
    #[error("LDAP connection failed: {0}")]
    Connection(String),

    #[error("LDAP bind failed: {0}")]
    Bind(String),
}

/// Directory connection used for bind checks.
#[async_trait]
pub trait LdapConnector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<(), LdapError>;

    /// Bind as `dn`; `Ok(false)` means the directory rejected the password.
    async fn bind(&self, dn: &str, password: &str) -> Result<bool, LdapError>;

    async fn unbind(&self);

    /// Extended diagnostic message of the last operation, if any.
    fn diagnostic_message(&self) -> Option<String> {
        None
    }
}

type BindDn = dyn Fn(&str) -> String + Send + Sync;

/// Identifies users by binding to an LDAP directory with their credentials.
pub struct LdapIdentifier {
    connector: Arc<dyn LdapConnector>,
    host: String,
    port: u16,
    bind_dn: Arc<BindDn>,
    username_field: String,
}

impl LdapIdentifier {
    pub fn new<F>(connector: Arc<dyn LdapConnector>, host: impl Into<String>, bind_dn: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            connector,
            host: host.into(),
            port: 389,
            bind_dn: Arc::new(bind_dn),
            username_field: CREDENTIAL_USERNAME.to_string(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_username_field(mut self, field: impl Into<String>) -> Self {
        self.username_field = field.into();
        self
    }

    async fn bind_user(&self, username: &str, password: &str) -> Result<bool, LdapError> {
        self.connector.connect(&self.host, self.port).await?;
        let dn = (self.bind_dn)(username);
        debug!(dn = %dn, "Binding to LDAP");
        let bound = self.connector.bind(&dn, password).await;
        self.connector.unbind().await;
        bound
    }
}

#[async_trait]
impl Identifier for LdapIdentifier {
    async fn identify(&self, credentials: &Credentials) -> Identification {
        let username = credentials.get(CREDENTIAL_USERNAME);
        let password = credentials
            .get(CREDENTIAL_PASSWORD)
            .filter(|password| !password.is_empty());
        let (Some(username), Some(password)) = (username, password) else {
            return Identification::not_found();
        };

        match self.bind_user(username, password).await {
            Ok(true) => {
                let mut record = Record::new();
                record.insert(
                    self.username_field.clone(),
                    Value::String(username.to_string()),
                );
                Identification::found(record)
            }
            Ok(false) => Identification::not_found(),
            Err(e) => {
                let mut errors = vec![e.to_string()];
                errors.extend(self.connector.diagnostic_message());
                Identification::failed(errors)
            }
        }
    }

    fn name(&self) -> &str {
        "ldap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDirectory {
        refuse_connection: bool,
        binds: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LdapConnector for FakeDirectory {
        async fn connect(&self, host: &str, _port: u16) -> Result<(), LdapError> {
            if self.refuse_connection {
                return Err(LdapError::Connection(format!("{host} unreachable")));
            }
            Ok(())
        }

        async fn bind(&self, dn: &str, password: &str) -> Result<bool, LdapError> {
            self.binds.lock().unwrap().push(dn.to_string());
            Ok(password == "secret")
        }

        async fn unbind(&self) {}

        fn diagnostic_message(&self) -> Option<String> {
            self.refuse_connection.then(|| "no route to host".to_string())
        }
    }

    fn credentials(password: &str) -> Credentials {
        Credentials::new()
            .with("username", "robert")
            .with("password", password)
    }

    #[tokio::test]
    async fn test_bind_success() {
        let directory = Arc::new(FakeDirectory::default());
        let identifier = LdapIdentifier::new(directory.clone(), "ldap.example.com", |user| {
            format!("cn={user},dc=example,dc=com")
        });
        let record = identifier
            .identify(&credentials("secret"))
            .await
            .into_record()
            .unwrap();
        assert_eq!(record["username"], json!("robert"));
        assert_eq!(
            *directory.binds.lock().unwrap(),
            vec!["cn=robert,dc=example,dc=com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_bind_rejected() {
        let identifier = LdapIdentifier::new(
            Arc::new(FakeDirectory::default()),
            "ldap.example.com",
            |user| user.to_string(),
        );
        assert_eq!(
            identifier.identify(&credentials("wrong")).await,
            Identification::not_found()
        );
        assert_eq!(
            identifier.identify(&credentials("")).await,
            Identification::not_found()
        );
    }

    #[tokio::test]
    async fn test_connection_fault_is_captured() {
        let directory = Arc::new(FakeDirectory {
            refuse_connection: true,
            ..Default::default()
        });
        let identifier = LdapIdentifier::new(directory, "ldap.example.com", |user| user.to_string());
        let identification = identifier.identify(&credentials("secret")).await;
        assert!(!identification.is_found());
        assert_eq!(
            identification.errors,
            vec![
                "LDAP connection failed: ldap.example.com unreachable".to_string(),
                "no route to host".to_string()
            ]
        );
    }
}
