use async_trait::async_trait;

use super::{Conditions, QueryKind, Resolver, ResolverError};
use crate::identity::Record;

/// Resolver over a fixed list of records, e.g. users declared in config.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    records: Vec<Record>,
}

impl MemoryResolver {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Resolver for MemoryResolver {
    async fn find(
        &self,
        conditions: &Conditions,
        kind: QueryKind,
    ) -> Result<Option<Record>, ResolverError> {
        if conditions.is_empty() {
            return Ok(None);
        }
        Ok(self
            .records
            .iter()
            .find(|record| conditions.matches(record, kind))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver() -> MemoryResolver {
        MemoryResolver::new(vec![
            json!({"id": 1, "username": "mariano", "email": "m@example.com"})
                .as_object()
                .cloned()
                .unwrap(),
            json!({"id": 2, "username": "robert", "email": "r@example.com"})
                .as_object()
                .cloned()
                .unwrap(),
        ])
    }

    #[tokio::test]
    async fn test_find_all() {
        let found = resolver()
            .find(&Conditions::new().with("username", "robert"), QueryKind::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["id"], json!(2));
    }

    #[tokio::test]
    async fn test_find_or_over_fields() {
        let conditions = Conditions::new()
            .with("username", "m@example.com")
            .with("email", "m@example.com");
        let found = resolver()
            .find(&conditions, QueryKind::Or)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["username"], json!("mariano"));
    }

    #[tokio::test]
    async fn test_empty_conditions_find_nothing() {
        let found = resolver()
            .find(&Conditions::new(), QueryKind::All)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
