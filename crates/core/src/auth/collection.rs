use std::sync::Arc;

use super::Authenticator;

/// Ordered list of authenticators evaluated by the service.
#[derive(Clone, Default)]
pub struct AuthenticatorCollection {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl AuthenticatorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, authenticator: Arc<dyn Authenticator>) {
        self.authenticators.push(authenticator);
    }

    pub fn with(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.add(authenticator);
        self
    }

    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Authenticator>> {
        self.authenticators.iter()
    }

    /// First authenticator registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Authenticator>> {
        self.authenticators.iter().find(|a| a.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.authenticators
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }
}

impl FromIterator<Arc<dyn Authenticator>> for AuthenticatorCollection {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Authenticator>>>(iter: I) -> Self {
        Self {
            authenticators: iter.into_iter().collect(),
        }
    }
}
