use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::Record;
use crate::auth::AuthError;

/// Authenticated identity.
///
/// Wraps the principal record with an alias map (`alias -> field`). The
/// default map contains `id -> id`; aliases that are not mapped resolve to
/// the field of the same name. The wrapped data cannot be modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    #[serde(flatten)]
    data: Record,
    #[serde(skip)]
    field_map: HashMap<String, String>,
}

impl Identity {
    pub fn new(data: Record) -> Self {
        Self::with_field_map(data, HashMap::new())
    }

    /// Build with extra aliases layered over the default `id -> id`.
    pub fn with_field_map(data: Record, fields: HashMap<String, String>) -> Self {
        let mut field_map = HashMap::from([("id".to_string(), "id".to_string())]);
        field_map.extend(fields);
        Self { data, field_map }
    }

    /// Primary key of the principal, via the `id` alias.
    pub fn identifier(&self) -> Option<&Value> {
        self.get("id")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        let field = self
            .field_map
            .get(field)
            .map(String::as_str)
            .unwrap_or(field);
        self.data.get(field)
    }

    /// String form of a field; numbers are rendered, other values yield `None`.
    pub fn get_string(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn original_data(&self) -> &Record {
        &self.data
    }

    pub fn field_map(&self) -> &HashMap<String, String> {
        &self.field_map
    }

    /// Always fails: identities are read-only views.
    pub fn set(&self, field: &str, _value: Value) -> Result<(), AuthError> {
        Err(AuthError::ImmutableIdentity(field.to_string()))
    }

    /// Always fails: identities are read-only views.
    pub fn unset(&self, field: &str) -> Result<(), AuthError> {
        Err(AuthError::ImmutableIdentity(field.to_string()))
    }
}
