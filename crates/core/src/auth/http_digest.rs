//! HTTP Digest authentication with HMAC-signed, expiring nonces.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use regex_lite::Regex;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{
    AuthError, AuthResult, AuthStatus, Authenticator, Challenge, StatelessAuthenticator,
};
use crate::hasher::constant_time_eq;
use crate::http::{AuthRequest, SERVER_AUTH_DIGEST, SERVER_NAME, SERVER_ORIGINAL_REQUEST_METHOD};
use crate::identifier::{Credentials, Identifier, CREDENTIAL_USERNAME};

type HmacSha256 = Hmac<Sha256>;

const REQUIRED_KEYS: [&str; 7] = ["nonce", "nc", "cnonce", "qop", "username", "uri", "response"];

/// `MD5(username:realm:password)`, the value stored for digest users.
pub fn digest_ha1(username: &str, password: &str, realm: &str) -> String {
    format!("{:x}", md5::compute(format!("{username}:{realm}:{password}")))
}

/// Settings for [`HttpDigestAuthenticator`].
#[derive(Debug, Clone)]
pub struct DigestOptions {
    /// Key used to sign nonces.
    pub secret: String,
    pub realm: Option<String>,
    pub qop: String,
    /// Nonce lifetime in seconds.
    pub nonce_lifetime: u64,
    pub opaque: Option<String>,
    /// Principal field holding the HA1 value.
    pub password_field: String,
}

impl DigestOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            realm: None,
            qop: "auth".to_string(),
            nonce_lifetime: 300,
            opaque: None,
            password_field: "ha1".to_string(),
        }
    }
}

pub struct HttpDigestAuthenticator {
    identifier: Arc<dyn Identifier>,
    options: DigestOptions,
    pattern: Regex,
}

impl HttpDigestAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>, options: DigestOptions) -> Result<Self, AuthError> {
        if options.secret.is_empty() {
            return Err(AuthError::Configuration(
                "http_digest requires a non-empty secret".to_string(),
            ));
        }
        let pattern = Regex::new(
            r#"(\w+)=(?:"([^"]*)"|'([^']*)'|([a-zA-Z0-9:#%?&@=./_+\-]+))"#,
        )
        .map_err(|e| AuthError::Configuration(e.to_string()))?;
        Ok(Self {
            identifier,
            options,
            pattern,
        })
    }

    /// Parse a digest header body into its key/value pairs. Returns `None`
    /// unless every required key is present.
    pub fn parse_auth_data(&self, digest: &str) -> Option<HashMap<String, String>> {
        let digest = match digest.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("digest ") => &digest[7..],
            _ => digest,
        };
        let values: HashMap<String, String> = self
            .pattern
            .captures_iter(digest)
            .filter_map(|caps| {
                let key = caps.get(1)?.as_str().to_string();
                let value = caps.get(2).or(caps.get(3)).or(caps.get(4))?;
                Some((key, value.as_str().to_string()))
            })
            .collect();

        REQUIRED_KEYS
            .iter()
            .all(|key| values.contains_key(*key))
            .then_some(values)
    }

    fn digest(&self, request: &AuthRequest) -> Option<HashMap<String, String>> {
        let raw = request
            .header("authorization")
            .filter(|value| {
                value
                    .get(..7)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("digest "))
            })
            .or_else(|| request.server_var(SERVER_AUTH_DIGEST))?;
        self.parse_auth_data(raw)
    }

    fn realm(&self, request: &AuthRequest) -> String {
        self.options
            .realm
            .clone()
            .or_else(|| request.server_var(SERVER_NAME).map(str::to_string))
            .unwrap_or_default()
    }

    fn signature(&self, expires: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.options.secret.as_bytes())
            .map_err(|e| AuthError::Configuration(e.to_string()))?;
        mac.update(format!("{}:{}", expires, self.options.secret).as_bytes());
        Ok(mac)
    }

    /// Create a nonce valid until `now + nonce_lifetime`.
    pub fn generate_nonce_at(&self, now: f64) -> Result<String, AuthError> {
        let expires = format!("{:.4}", now + self.options.nonce_lifetime as f64);
        let checksum = hex::encode(self.signature(&expires)?.finalize().into_bytes());
        Ok(STANDARD.encode(format!("{expires}:{checksum}")))
    }

    pub fn generate_nonce(&self) -> Result<String, AuthError> {
        self.generate_nonce_at(unix_now())
    }

    /// Check signature and expiry of a nonce at time `now`.
    pub fn valid_nonce_at(&self, nonce: &str, now: f64) -> bool {
        let Ok(decoded) = STANDARD.decode(nonce) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        let parts: Vec<&str> = decoded.split(':').collect();
        let [expires, checksum] = parts.as_slice() else {
            return false;
        };
        match expires.parse::<f64>() {
            Ok(expiry) if expiry >= now => {}
            _ => return false,
        }
        let Ok(checksum) = hex::decode(checksum) else {
            return false;
        };
        match self.signature(expires) {
            Ok(mac) => mac.verify_slice(&checksum).is_ok(),
            Err(_) => false,
        }
    }

    pub fn valid_nonce(&self, nonce: &str) -> bool {
        self.valid_nonce_at(nonce, unix_now())
    }

    /// `MD5(ha1:nonce:nc:cnonce:qop:MD5(method:uri))`
    pub fn generate_response_hash(
        &self,
        digest: &HashMap<String, String>,
        ha1: &str,
        method: &str,
    ) -> String {
        let field = |key: &str| digest.get(key).map(String::as_str).unwrap_or_default();
        let ha2 = format!("{:x}", md5::compute(format!("{}:{}", method, field("uri"))));
        format!(
            "{:x}",
            md5::compute(format!(
                "{}:{}:{}:{}:{}:{}",
                ha1,
                field("nonce"),
                field("nc"),
                field("cnonce"),
                field("qop"),
                ha2
            ))
        )
    }

    fn challenge_header(&self, request: &AuthRequest) -> Result<String, AuthError> {
        let realm = self.realm(request);
        let opaque = self
            .options
            .opaque
            .clone()
            .unwrap_or_else(|| format!("{:x}", md5::compute(&realm)));
        let mut header = format!(
            "Digest realm=\"{}\",qop=\"{}\",nonce=\"{}\",opaque=\"{}\"",
            realm,
            self.options.qop,
            self.generate_nonce()?,
            opaque
        );
        let stale = self
            .digest(request)
            .is_some_and(|digest| !self.valid_nonce(&digest["nonce"]));
        if stale {
            header.push_str(",stale=true");
        }
        Ok(header)
    }
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[async_trait]
impl Authenticator for HttpDigestAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let Some(digest) = self.digest(request) else {
            return AuthResult::failure(AuthStatus::FailureCredentialsMissing, Vec::new());
        };

        let credentials = Credentials::new().with(CREDENTIAL_USERNAME, digest["username"].as_str());
        let identification = self.identifier.identify(&credentials).await;
        let Some(record) = identification.record else {
            return AuthResult::failure(AuthStatus::FailureIdentityNotFound, identification.errors);
        };

        if !self.valid_nonce(&digest["nonce"]) {
            debug!(username = %digest["username"], "Digest nonce invalid or expired");
            return AuthResult::failure(AuthStatus::FailureCredentialsInvalid, Vec::new());
        }

        let ha1 = record
            .get(&self.options.password_field)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let method = request
            .server_var(SERVER_ORIGINAL_REQUEST_METHOD)
            .unwrap_or(&request.method);
        let expected = self.generate_response_hash(&digest, ha1, method);

        if constant_time_eq(expected.as_bytes(), digest["response"].as_bytes()) {
            AuthResult::success(record)
        } else {
            AuthResult::failure(AuthStatus::FailureCredentialsInvalid, Vec::new())
        }
    }

    fn name(&self) -> &str {
        "http_digest"
    }

    fn as_stateless(&self) -> Option<&dyn StatelessAuthenticator> {
        Some(self)
    }
}

impl StatelessAuthenticator for HttpDigestAuthenticator {
    fn unauthorized_challenge(&self, request: &AuthRequest) -> Result<(), AuthError> {
        let header = self.challenge_header(request)?;
        Err(AuthError::Challenge(Challenge::unauthorized(vec![(
            "WWW-Authenticate".to_string(),
            header,
        )])))
    }
}
