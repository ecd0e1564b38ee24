//! Pluggable authentication for HTTP applications.
//!
//! An [`AuthenticationService`] runs an ordered [`AuthenticatorCollection`]
//! against an [`AuthRequest`]. Each authenticator pulls credentials out of the
//! request and hands them to an identifier, which looks the principal up
//! through a resolver and verifies secrets with a password hasher. The first
//! valid result wins; stateless authenticators may raise a challenge and
//! persistence-capable ones write the identity to a cookie or session.

pub mod auth;
pub mod config;
pub mod hasher;
pub mod http;
pub mod identifier;
pub mod identity;
pub mod resolver;
pub mod service;
pub mod session;
pub mod storage;
pub mod testing;

pub use auth::{
    create_authenticators, AuthData, AuthError, AuthResult, AuthStatus, Authenticator,
    AuthenticatorCollection, Challenge, Failure, PersistenceAuthenticator, PersistenceResult,
    StatelessAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use http::{AuthRequest, AuthResponse};
pub use identity::{DefaultIdentityFactory, Identity, IdentityFactory, Record};
pub use service::{AuthenticationService, ServiceOptions};
pub use session::{open_session, MemorySessionStore, Session, SessionError, SessionStore};
