//! Builds resolvers, hashers, identifiers and authenticators from config.

use std::sync::Arc;
use tracing::info;

use super::{
    AuthError, Authenticator, AuthenticatorCollection, CookieAuthenticator, DefaultUrlChecker,
    DigestOptions, EnvironmentAuthenticator, FormAuthenticator, HttpBasicAuthenticator,
    HttpDigestAuthenticator, JwtAuthenticator, JwtOptions, SessionAuthenticator,
    TokenAuthenticator, TokenSource, UrlChecker,
};
use crate::config::{AuthenticatorConfig, Config, HasherConfig, IdentifierConfig, LoginUrlConfig, ResolverConfig};
use crate::hasher::{
    DefaultPasswordHasher, FallbackPasswordHasher, LegacyPasswordHasher, PasswordHasher,
};
use crate::identifier::{Identifier, PasswordIdentifier, TokenIdentifier};
use crate::resolver::{MemoryResolver, Resolver, SqliteResolver};
use crate::storage::{CookieStorage, SessionStorage};

/// Create the principal resolver
pub fn create_resolver(config: &ResolverConfig) -> Result<Arc<dyn Resolver>, AuthError> {
    match config {
        ResolverConfig::Memory { users } => Ok(Arc::new(MemoryResolver::new(users.clone()))),
        ResolverConfig::Sqlite { path, table } => {
            let resolver = SqliteResolver::new(path, table)
                .map_err(|e| AuthError::Configuration(e.to_string()))?;
            Ok(Arc::new(resolver))
        }
    }
}

/// Create a password hasher
pub fn create_hasher(config: &HasherConfig) -> Result<Arc<dyn PasswordHasher>, AuthError> {
    match config {
        HasherConfig::Default {
            m_cost: None,
            t_cost: None,
            p_cost: None,
        } => Ok(Arc::new(DefaultPasswordHasher::new())),
        HasherConfig::Default {
            m_cost,
            t_cost,
            p_cost,
        } => {
            let defaults = argon2::Params::default();
            let hasher = DefaultPasswordHasher::with_params(
                m_cost.unwrap_or(defaults.m_cost()),
                t_cost.unwrap_or(defaults.t_cost()),
                p_cost.unwrap_or(defaults.p_cost()),
            )?;
            Ok(Arc::new(hasher))
        }
        HasherConfig::Legacy { salt } => Ok(Arc::new(LegacyPasswordHasher::new(salt.clone()))),
        HasherConfig::Fallback { hashers } => {
            let hashers = hashers
                .iter()
                .map(create_hasher)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Arc::new(FallbackPasswordHasher::new(hashers)?))
        }
    }
}

/// Create an identifier over `resolver`
pub fn create_identifier(
    config: &IdentifierConfig,
    resolver: Arc<dyn Resolver>,
) -> Result<Arc<dyn Identifier>, AuthError> {
    let identifier: Arc<dyn Identifier> = match config {
        IdentifierConfig::Password {
            username_fields,
            password_field,
            hasher,
        } => Arc::new(
            PasswordIdentifier::new(resolver)
                .with_hasher(create_hasher(hasher)?)
                .with_username_fields(username_fields.clone())
                .with_password_field(password_field.clone()),
        ),
        IdentifierConfig::Token {
            token_field,
            data_field,
            hash_algorithm,
        } => Arc::new(
            TokenIdentifier::new(resolver)
                .with_token_field(token_field.clone())
                .with_data_field(data_field.clone())
                .with_hash_algorithm(*hash_algorithm),
        ),
        IdentifierConfig::JwtSubject {
            token_field,
            data_field,
        } => Arc::new(
            TokenIdentifier::jwt_subject(resolver)
                .with_token_field(token_field.clone())
                .with_data_field(data_field.clone()),
        ),
    };
    Ok(identifier)
}

/// Identifier used when an authenticator does not configure one.
fn default_identifier(config: &AuthenticatorConfig) -> IdentifierConfig {
    match config {
        AuthenticatorConfig::Token(_) => IdentifierConfig::Token {
            token_field: "token".to_string(),
            data_field: "token".to_string(),
            hash_algorithm: None,
        },
        AuthenticatorConfig::Jwt(_) => IdentifierConfig::JwtSubject {
            token_field: "id".to_string(),
            data_field: "sub".to_string(),
        },
        AuthenticatorConfig::Environment(env) => IdentifierConfig::Token {
            token_field: "username".to_string(),
            data_field: env.fields.first().cloned().unwrap_or_default(),
            hash_algorithm: None,
        },
        _ => IdentifierConfig::password(),
    }
}

fn url_checker(login: &LoginUrlConfig) -> Arc<dyn UrlChecker> {
    Arc::new(DefaultUrlChecker::new(login.use_regex, login.check_full_url))
}

/// Create a single authenticator
pub fn create_authenticator(
    config: &AuthenticatorConfig,
    resolver: Arc<dyn Resolver>,
    identity_attribute: &str,
) -> Result<Arc<dyn Authenticator>, AuthError> {
    let identifier_config = config
        .identifier()
        .cloned()
        .unwrap_or_else(|| default_identifier(config));
    let identifier = create_identifier(&identifier_config, resolver)?;

    let authenticator: Arc<dyn Authenticator> = match config {
        AuthenticatorConfig::Session(c) => Arc::new(
            SessionAuthenticator::new(identifier)
                .with_storage(Arc::new(SessionStorage::new(c.session_key.clone())))
                .with_identify(c.identify)
                .with_fields(c.fields.clone().into_iter().collect())
                .with_identity_attribute(identity_attribute),
        ),
        AuthenticatorConfig::Form(c) => Arc::new(
            FormAuthenticator::new(identifier)
                .with_fields(c.fields.clone().into_iter().collect())
                .with_login_url(c.login.login_url.clone())
                .with_url_checker(url_checker(&c.login)),
        ),
        AuthenticatorConfig::Environment(c) => Arc::new(
            EnvironmentAuthenticator::new(identifier, c.fields.clone())
                .with_optional_fields(c.optional_fields.clone())
                .with_login_url(c.login.login_url.clone())
                .with_url_checker(url_checker(&c.login)),
        ),
        AuthenticatorConfig::HttpBasic(c) => {
            Arc::new(HttpBasicAuthenticator::new(identifier).with_realm(c.realm.clone()))
        }
        AuthenticatorConfig::HttpDigest(c) => {
            let options = DigestOptions {
                secret: c.secret.clone(),
                realm: c.realm.clone(),
                qop: c.qop.clone(),
                nonce_lifetime: c.nonce_lifetime,
                opaque: c.opaque.clone(),
                password_field: c.password_field.clone(),
            };
            Arc::new(HttpDigestAuthenticator::new(identifier, options)?)
        }
        AuthenticatorConfig::Token(c) => {
            let source = TokenSource {
                header: c.header.clone(),
                query_param: c.query_param.clone(),
                token_prefix: c.token_prefix.clone(),
            };
            Arc::new(TokenAuthenticator::new(identifier, source))
        }
        AuthenticatorConfig::Jwt(c) => {
            let options = JwtOptions {
                secret: c.secret.clone(),
                algorithms: c.algorithms.clone(),
                source: TokenSource {
                    header: c.header.clone(),
                    query_param: c.query_param.clone(),
                    token_prefix: c.token_prefix.clone(),
                },
                subject_key: c.subject_key.clone(),
                return_payload: c.return_payload,
            };
            Arc::new(JwtAuthenticator::new(identifier, options)?)
        }
        AuthenticatorConfig::Cookie(c) => Arc::new(
            CookieAuthenticator::new(identifier)
                .with_storage(Arc::new(CookieStorage::new(c.cookie.clone())))
                .with_hasher(create_hasher(&c.hasher)?)
                .with_fields(c.username_field.clone(), c.password_field.clone())
                .with_remember_me_field(c.remember_me_field.clone())
                .with_salt(c.salt.clone())
                .with_login_url(c.login.login_url.clone())
                .with_url_checker(url_checker(&c.login)),
        ),
    };
    Ok(authenticator)
}

/// Create the ordered authenticator collection described by `config`
pub fn create_authenticators(config: &Config) -> Result<AuthenticatorCollection, AuthError> {
    if config.authenticators.is_empty() {
        return Err(AuthError::NoAuthenticators);
    }
    let resolver = create_resolver(&config.resolver)?;
    let identity_attribute = &config.service.options.identity_attribute;

    let collection = config
        .authenticators
        .iter()
        .map(|c| create_authenticator(c, resolver.clone(), identity_attribute))
        .collect::<Result<AuthenticatorCollection, _>>()?;

    info!(authenticators = ?collection.names(), "Authenticators loaded");
    Ok(collection)
}
