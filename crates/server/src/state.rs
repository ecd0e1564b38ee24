use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::{
    create_authenticators, AuthError, AuthenticationService, AuthenticatorCollection, Config,
    DefaultIdentityFactory, IdentityFactory, MemorySessionStore, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticators: AuthenticatorCollection,
    identity_factory: Arc<dyn IdentityFactory>,
    sessions: Arc<MemorySessionStore>,
}

impl AppState {
    pub fn new(config: Config, authenticators: AuthenticatorCollection) -> Self {
        let identity_factory = Arc::new(DefaultIdentityFactory::with_field_map(
            config.service.identity_fields.clone(),
        ));
        let session_ttl = Duration::from_secs(config.session.idle_timeout_secs);
        Self {
            config,
            authenticators,
            identity_factory,
            sessions: Arc::new(MemorySessionStore::with_ttl(session_ttl)),
        }
    }

    /// Build the authenticators described by `config`.
    pub fn from_config(config: Config) -> Result<Self, AuthError> {
        let authenticators = create_authenticators(&config)?;
        Ok(Self::new(config, authenticators))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticators(&self) -> &AuthenticatorCollection {
        &self.authenticators
    }

    pub fn session_store(&self) -> &MemorySessionStore {
        self.sessions.as_ref()
    }

    /// A fresh service for one request.
    pub fn service(&self) -> AuthenticationService {
        AuthenticationService::new(self.authenticators.clone())
            .with_identity_factory(self.identity_factory.clone())
            .with_options(self.config.service.options.clone())
    }
}
