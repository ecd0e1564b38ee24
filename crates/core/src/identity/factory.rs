use std::collections::HashMap;
use std::sync::Arc;

use super::{Identity, Record};

/// Builds identities from raw principal data.
pub trait IdentityFactory: Send + Sync {
    fn create(&self, data: Record) -> Arc<Identity>;
}

/// Factory applying a fixed alias map to every identity.
#[derive(Debug, Clone, Default)]
pub struct DefaultIdentityFactory {
    field_map: HashMap<String, String>,
}

impl DefaultIdentityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_map(field_map: HashMap<String, String>) -> Self {
        Self { field_map }
    }
}

impl IdentityFactory for DefaultIdentityFactory {
    fn create(&self, data: Record) -> Arc<Identity> {
        Arc::new(Identity::with_field_map(data, self.field_map.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_applies_field_map() {
        let factory = DefaultIdentityFactory::with_field_map(HashMap::from([(
            "id".to_string(),
            "uuid".to_string(),
        )]));
        let data = json!({"uuid": "u-1"}).as_object().cloned().unwrap();
        let identity = factory.create(data);
        assert_eq!(identity.identifier(), Some(&json!("u-1")));
    }
}
