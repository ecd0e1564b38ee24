use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::identifier::TokenHashAlgorithm;
use crate::identity::Record;
use crate::service::ServiceOptions;
use crate::storage::CookieOptions;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Authenticators in evaluation order.
    pub authenticators: Vec<AuthenticatorConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub options: ServiceOptions,
    /// Identity aliases (`alias -> field`) layered over `id -> id`.
    #[serde(default)]
    pub identity_fields: HashMap<String, String>,
}

/// Backing store for principals
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// Users declared inline.
    Memory {
        #[serde(default)]
        users: Vec<Record>,
    },
    /// Users read from a SQLite table.
    Sqlite {
        path: PathBuf,
        #[serde(default = "default_table")]
        table: String,
    },
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::Memory { users: Vec::new() }
    }
}

fn default_table() -> String {
    "users".to_string()
}

/// Server-side session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_cookie")]
    pub cookie_name: String,
    #[serde(default)]
    pub secure: bool,
    /// Seconds a stored session survives without being used.
    #[serde(default = "default_session_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie(),
            secure: false,
            idle_timeout_secs: default_session_idle_timeout(),
        }
    }
}

fn default_session_cookie() -> String {
    "GATEHOUSE_SESSION".to_string()
}

fn default_session_idle_timeout() -> u64 {
    1800
}

/// Password hasher selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HasherConfig {
    /// Argon2id; unset costs use the library defaults.
    Default {
        #[serde(default)]
        m_cost: Option<u32>,
        #[serde(default)]
        t_cost: Option<u32>,
        #[serde(default)]
        p_cost: Option<u32>,
    },
    /// Salted SHA-256 hex digests.
    Legacy {
        #[serde(default)]
        salt: String,
    },
    /// First hasher hashes; any of them may verify.
    Fallback { hashers: Vec<HasherConfig> },
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::Default {
            m_cost: None,
            t_cost: None,
            p_cost: None,
        }
    }
}

/// Identifier selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentifierConfig {
    Password {
        #[serde(default = "default_username_fields")]
        username_fields: Vec<String>,
        #[serde(default = "default_password_field")]
        password_field: String,
        #[serde(default)]
        hasher: HasherConfig,
    },
    Token {
        #[serde(default = "default_token_field")]
        token_field: String,
        #[serde(default = "default_token_field")]
        data_field: String,
        #[serde(default)]
        hash_algorithm: Option<TokenHashAlgorithm>,
    },
    JwtSubject {
        #[serde(default = "default_jwt_token_field")]
        token_field: String,
        #[serde(default = "default_jwt_data_field")]
        data_field: String,
    },
}

impl IdentifierConfig {
    pub fn password() -> Self {
        Self::Password {
            username_fields: default_username_fields(),
            password_field: default_password_field(),
            hasher: HasherConfig::default(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Token { .. } => "token",
            Self::JwtSubject { .. } => "jwt_subject",
        }
    }
}

fn default_username_fields() -> Vec<String> {
    vec!["username".to_string()]
}

fn default_password_field() -> String {
    "password".to_string()
}

fn default_token_field() -> String {
    "token".to_string()
}

fn default_jwt_token_field() -> String {
    "id".to_string()
}

fn default_jwt_data_field() -> String {
    "sub".to_string()
}

/// Login URL restriction shared by form-like authenticators.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginUrlConfig {
    #[serde(default)]
    pub login_url: Vec<String>,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub check_full_url: bool,
}

/// One entry of `[[authenticators]]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthenticatorConfig {
    Session(SessionAuthConfig),
    Form(FormAuthConfig),
    Environment(EnvironmentAuthConfig),
    HttpBasic(HttpBasicAuthConfig),
    HttpDigest(HttpDigestAuthConfig),
    Token(TokenAuthConfig),
    Jwt(JwtAuthConfig),
    Cookie(CookieAuthConfig),
}

impl AuthenticatorConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Session(_) => "session",
            Self::Form(_) => "form",
            Self::Environment(_) => "environment",
            Self::HttpBasic(_) => "http_basic",
            Self::HttpDigest(_) => "http_digest",
            Self::Token(_) => "token",
            Self::Jwt(_) => "jwt",
            Self::Cookie(_) => "cookie",
        }
    }

    /// Explicitly configured identifier, if any.
    pub fn identifier(&self) -> Option<&IdentifierConfig> {
        match self {
            Self::Session(c) => c.identifier.as_ref(),
            Self::Form(c) => c.identifier.as_ref(),
            Self::Environment(c) => c.identifier.as_ref(),
            Self::HttpBasic(c) => c.identifier.as_ref(),
            Self::HttpDigest(c) => c.identifier.as_ref(),
            Self::Token(c) => c.identifier.as_ref(),
            Self::Jwt(c) => c.identifier.as_ref(),
            Self::Cookie(c) => c.identifier.as_ref(),
        }
    }

    /// Login URL restriction, for authenticators that have one.
    pub fn login_url(&self) -> Option<&LoginUrlConfig> {
        match self {
            Self::Form(c) => Some(&c.login),
            Self::Environment(c) => Some(&c.login),
            Self::Cookie(c) => Some(&c.login),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    #[serde(default = "default_session_key")]
    pub session_key: String,
    /// Re-verify the stored identity on every request.
    #[serde(default)]
    pub identify: bool,
    #[serde(default = "default_session_fields")]
    pub fields: BTreeMap<String, String>,
}

fn default_session_key() -> String {
    "Auth".to_string()
}

fn default_session_fields() -> BTreeMap<String, String> {
    BTreeMap::from([("username".to_string(), "username".to_string())])
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    /// Credential key -> body field (dotted paths allowed).
    #[serde(default = "default_form_fields")]
    pub fields: BTreeMap<String, String>,
    #[serde(flatten)]
    pub login: LoginUrlConfig,
}

impl Default for FormAuthConfig {
    fn default() -> Self {
        Self {
            identifier: None,
            fields: default_form_fields(),
            login: LoginUrlConfig::default(),
        }
    }
}

fn default_form_fields() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("username".to_string(), "username".to_string()),
        ("password".to_string(), "password".to_string()),
    ])
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnvironmentAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    /// Server variables that must be present.
    pub fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
    #[serde(flatten)]
    pub login: LoginUrlConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HttpBasicAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    #[serde(default)]
    pub realm: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpDigestAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    pub secret: String,
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(default = "default_qop")]
    pub qop: String,
    #[serde(default = "default_nonce_lifetime")]
    pub nonce_lifetime: u64,
    #[serde(default)]
    pub opaque: Option<String>,
    #[serde(default = "default_ha1_field")]
    pub password_field: String,
}

fn default_qop() -> String {
    "auth".to_string()
}

fn default_nonce_lifetime() -> u64 {
    300
}

fn default_ha1_field() -> String {
    "ha1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub query_param: Option<String>,
    #[serde(default)]
    pub token_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    pub secret: String,
    #[serde(default = "default_jwt_algorithms")]
    pub algorithms: Vec<String>,
    #[serde(default = "default_jwt_header")]
    pub header: Option<String>,
    #[serde(default = "default_jwt_query_param")]
    pub query_param: Option<String>,
    #[serde(default = "default_jwt_prefix")]
    pub token_prefix: Option<String>,
    #[serde(default = "default_jwt_data_field")]
    pub subject_key: String,
    #[serde(default = "default_true")]
    pub return_payload: bool,
}

fn default_jwt_algorithms() -> Vec<String> {
    vec!["HS256".to_string()]
}

fn default_jwt_header() -> Option<String> {
    Some("authorization".to_string())
}

fn default_jwt_query_param() -> Option<String> {
    Some("token".to_string())
}

fn default_jwt_prefix() -> Option<String> {
    Some("bearer".to_string())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookieAuthConfig {
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    #[serde(default)]
    pub cookie: CookieOptions,
    #[serde(default = "default_remember_me_field")]
    pub remember_me_field: String,
    #[serde(default = "default_cookie_username_field")]
    pub username_field: String,
    #[serde(default = "default_password_field")]
    pub password_field: String,
    #[serde(default)]
    pub salt: Option<String>,
    /// Hasher for the cookie token.
    #[serde(default)]
    pub hasher: HasherConfig,
    #[serde(flatten)]
    pub login: LoginUrlConfig,
}

impl Default for CookieAuthConfig {
    fn default() -> Self {
        Self {
            identifier: None,
            cookie: CookieOptions::default(),
            remember_me_field: default_remember_me_field(),
            username_field: default_cookie_username_field(),
            password_field: default_password_field(),
            salt: None,
            hasher: HasherConfig::default(),
            login: LoginUrlConfig::default(),
        }
    }
}

fn default_remember_me_field() -> String {
    "remember_me".to_string()
}

fn default_cookie_username_field() -> String {
    "username".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub service: ServiceOptions,
    pub resolver: SanitizedResolverConfig,
    pub session: SessionConfig,
    pub authenticators: Vec<SanitizedAuthenticatorConfig>,
}

/// Resolver summary (user records omitted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedResolverConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

/// Authenticator summary (secrets hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthenticatorConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_configured: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub login_url: Vec<String>,
}

impl From<&AuthenticatorConfig> for SanitizedAuthenticatorConfig {
    fn from(config: &AuthenticatorConfig) -> Self {
        let secret_configured = match config {
            AuthenticatorConfig::HttpDigest(c) => Some(!c.secret.is_empty()),
            AuthenticatorConfig::Jwt(c) => Some(!c.secret.is_empty()),
            AuthenticatorConfig::Cookie(c) => Some(c.salt.as_deref().is_some_and(|s| !s.is_empty())),
            _ => None,
        };
        Self {
            kind: config.kind().to_string(),
            identifier: config.identifier().map(|i| i.kind().to_string()),
            secret_configured,
            login_url: config
                .login_url()
                .map(|l| l.login_url.clone())
                .unwrap_or_default(),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let resolver = match &config.resolver {
            ResolverConfig::Memory { users } => SanitizedResolverConfig {
                kind: "memory".to_string(),
                users: Some(users.len()),
                path: None,
                table: None,
            },
            ResolverConfig::Sqlite { path, table } => SanitizedResolverConfig {
                kind: "sqlite".to_string(),
                users: None,
                path: Some(path.clone()),
                table: Some(table.clone()),
            },
        };
        Self {
            server: config.server.clone(),
            service: config.service.options.clone(),
            resolver,
            session: config.session.clone(),
            authenticators: config.authenticators.iter().map(Into::into).collect(),
        }
    }
}
