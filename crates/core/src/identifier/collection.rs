use async_trait::async_trait;
use std::sync::Arc;

use super::{Credentials, Identification, Identifier};

/// Detailed outcome of one [`IdentifierCollection`] lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionOutcome {
    pub identification: Identification,
    /// Name of the identifier that matched.
    pub successful: Option<String>,
    /// Errors of every identifier that did not match, keyed by name.
    pub errors_by_identifier: Vec<(String, Vec<String>)>,
}

/// Ordered identifiers tried until one of them matches.
#[derive(Default)]
pub struct IdentifierCollection {
    identifiers: Vec<Arc<dyn Identifier>>,
}

impl IdentifierCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, identifier: Arc<dyn Identifier>) {
        self.identifiers.push(identifier);
    }

    pub fn with(mut self, identifier: Arc<dyn Identifier>) -> Self {
        self.add(identifier);
        self
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Try each identifier in order and report which one matched.
    pub async fn lookup(&self, credentials: &Credentials) -> CollectionOutcome {
        let mut errors_by_identifier = Vec::new();
        for identifier in &self.identifiers {
            let identification = identifier.identify(credentials).await;
            if identification.is_found() {
                return CollectionOutcome {
                    identification,
                    successful: Some(identifier.name().to_string()),
                    errors_by_identifier,
                };
            }
            errors_by_identifier.push((identifier.name().to_string(), identification.errors));
        }
        CollectionOutcome {
            errors_by_identifier,
            ..CollectionOutcome::default()
        }
    }
}

#[async_trait]
impl Identifier for IdentifierCollection {
    async fn identify(&self, credentials: &Credentials) -> Identification {
        let outcome = self.lookup(credentials).await;
        if outcome.identification.is_found() {
            return outcome.identification;
        }
        Identification::failed(
            outcome
                .errors_by_identifier
                .iter()
                .flat_map(|(name, errors)| errors.iter().map(move |e| format!("{name}: {e}")))
                .collect(),
        )
    }

    fn name(&self) -> &str {
        "collection"
    }
}
