use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::identity::Record;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),
}

/// How multiple conditions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    /// Every condition must match.
    #[default]
    All,
    /// Any condition may match.
    Or,
}

/// Ordered `field = value` conditions for a lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions(Vec<(String, Value)>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((field.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluate against an in-memory record.
    pub fn matches(&self, record: &Record, kind: QueryKind) -> bool {
        let mut results = self.iter().map(|(field, value)| {
            record
                .get(field)
                .is_some_and(|candidate| values_equal(candidate, value))
        });
        match kind {
            QueryKind::All => results.all(|matched| matched),
            QueryKind::Or => results.any(|matched| matched),
        }
    }
}

fn values_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == *s
        }
        _ => stored == wanted,
    }
}

/// Backing-store lookup capability.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Find the first record matching `conditions`.
    async fn find(
        &self,
        conditions: &Conditions,
        kind: QueryKind,
    ) -> Result<Option<Record>, ResolverError>;
}
