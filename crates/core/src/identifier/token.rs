use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

use super::{Credentials, Identification, Identifier, CREDENTIAL_JWT_SUBJECT, CREDENTIAL_TOKEN};
use crate::resolver::{Conditions, QueryKind, Resolver};

/// Digest applied to a token before it is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenHashAlgorithm {
    Sha256,
}

impl TokenHashAlgorithm {
    pub fn digest(&self, token: &str) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(token.as_bytes())),
        }
    }
}

/// Identifies principals by an opaque token stored next to them.
pub struct TokenIdentifier {
    resolver: Arc<dyn Resolver>,
    token_field: String,
    data_field: String,
    hash_algorithm: Option<TokenHashAlgorithm>,
}

impl TokenIdentifier {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            token_field: CREDENTIAL_TOKEN.to_string(),
            data_field: CREDENTIAL_TOKEN.to_string(),
            hash_algorithm: None,
        }
    }

    /// Resolve the `sub` claim of a JWT against the `id` field.
    pub fn jwt_subject(resolver: Arc<dyn Resolver>) -> Self {
        Self::new(resolver)
            .with_token_field("id")
            .with_data_field(CREDENTIAL_JWT_SUBJECT)
    }

    /// Field of the stored principal holding the token.
    pub fn with_token_field(mut self, field: impl Into<String>) -> Self {
        self.token_field = field.into();
        self
    }

    /// Credential key carrying the token.
    pub fn with_data_field(mut self, field: impl Into<String>) -> Self {
        self.data_field = field.into();
        self
    }

    pub fn with_hash_algorithm(mut self, algorithm: Option<TokenHashAlgorithm>) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    pub fn data_field(&self) -> &str {
        &self.data_field
    }
}

#[async_trait]
impl Identifier for TokenIdentifier {
    async fn identify(&self, credentials: &Credentials) -> Identification {
        let Some(token) = credentials.get(&self.data_field) else {
            return Identification::not_found();
        };
        let token = match self.hash_algorithm {
            Some(algorithm) => algorithm.digest(token),
            None => token.to_string(),
        };
        let conditions = Conditions::new().with(self.token_field.as_str(), token);

        match self.resolver.find(&conditions, QueryKind::All).await {
            Ok(identity) => identity.into(),
            Err(e) => {
                warn!(error = %e, "Resolver lookup failed");
                Identification::failed(vec![e.to_string()])
            }
        }
    }

    fn name(&self) -> &str {
        "token"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MemoryResolver;
    use serde_json::json;

    fn resolver() -> Arc<dyn Resolver> {
        Arc::new(MemoryResolver::new(vec![
            json!({"id": 1, "username": "mariano", "token": "abc",
                   "hashed": TokenHashAlgorithm::Sha256.digest("xyz")})
            .as_object()
            .cloned()
            .unwrap(),
        ]))
    }

    #[tokio::test]
    async fn test_identify_by_token() {
        let identifier = TokenIdentifier::new(resolver());
        let record = identifier
            .identify(&Credentials::new().with("token", "abc"))
            .await
            .into_record()
            .unwrap();
        assert_eq!(record["username"], json!("mariano"));
        assert!(!identifier
            .identify(&Credentials::new().with("token", "nope"))
            .await
            .is_found());
        assert!(!identifier.identify(&Credentials::new()).await.is_found());
    }

    #[tokio::test]
    async fn test_hashed_token_lookup() {
        let identifier = TokenIdentifier::new(resolver())
            .with_token_field("hashed")
            .with_hash_algorithm(Some(TokenHashAlgorithm::Sha256));
        assert!(identifier
            .identify(&Credentials::new().with("token", "xyz"))
            .await
            .is_found());
    }

    #[tokio::test]
    async fn test_jwt_subject_preset() {
        let identifier = TokenIdentifier::jwt_subject(resolver());
        let record = identifier
            .identify(&Credentials::new().with("sub", "1"))
            .await
            .into_record()
            .unwrap();
        assert_eq!(record["id"], json!(1));
    }
}
