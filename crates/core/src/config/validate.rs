use regex_lite::Regex;

use super::{
    types::{AuthenticatorConfig, Config, HasherConfig, IdentifierConfig},
    ConfigError,
};
use crate::auth::parse_algorithms;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one authenticator is configured
/// - Digest and JWT secrets are set, JWT algorithms are supported
/// - Regex login URLs compile
/// - Environment authenticators name at least one field
/// - Fallback hashers are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.session.idle_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "session.idle_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.authenticators.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one authenticator must be configured".to_string(),
        ));
    }

    for (index, authenticator) in config.authenticators.iter().enumerate() {
        validate_authenticator(index, authenticator)?;
    }

    Ok(())
}

fn validate_authenticator(index: usize, config: &AuthenticatorConfig) -> Result<(), ConfigError> {
    let context = format!("authenticators[{}] ({})", index, config.kind());

    match config {
        AuthenticatorConfig::HttpDigest(digest) if digest.secret.is_empty() => {
            return Err(ConfigError::ValidationError(format!(
                "{}: secret cannot be empty",
                context
            )));
        }
        AuthenticatorConfig::Jwt(jwt) => {
            if jwt.secret.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{}: secret cannot be empty",
                    context
                )));
            }
            parse_algorithms(&jwt.algorithms)
                .map_err(|e| ConfigError::ValidationError(format!("{}: {}", context, e)))?;
        }
        AuthenticatorConfig::Environment(env) if env.fields.is_empty() => {
            return Err(ConfigError::ValidationError(format!(
                "{}: fields cannot be empty",
                context
            )));
        }
        AuthenticatorConfig::Cookie(cookie) => validate_hasher(&context, &cookie.hasher)?,
        _ => {}
    }

    if let Some(login) = config.login_url() {
        if login.use_regex {
            for pattern in &login.login_url {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "{}: invalid login_url pattern `{}`: {}",
                        context, pattern, e
                    ))
                })?;
            }
        }
    }

    if let Some(IdentifierConfig::Password { hasher, .. }) = config.identifier() {
        validate_hasher(&context, hasher)?;
    }

    Ok(())
}

fn validate_hasher(context: &str, hasher: &HasherConfig) -> Result<(), ConfigError> {
    if let HasherConfig::Fallback { hashers } = hasher {
        if hashers.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{}: fallback hasher needs at least one hasher",
                context
            )));
        }
        for inner in hashers {
            validate_hasher(context, inner)?;
        }
    }
    Ok(())
}
