use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Storage, StorageError};
use crate::http::{AuthRequest, AuthResponse, SameSite, SetCookie};

/// Attributes of the cookie written by [`CookieStorage`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CookieOptions {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_http_only")]
    pub http_only: bool,
    /// Lifetime in seconds; session cookie when unset.
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            path: default_cookie_path(),
            domain: None,
            secure: false,
            http_only: default_http_only(),
            max_age: None,
            same_site: None,
        }
    }
}

fn default_cookie_name() -> String {
    "CookieAuth".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_http_only() -> bool {
    true
}

/// Stores a JSON value in a client cookie.
#[derive(Debug, Clone, Default)]
pub struct CookieStorage {
    options: CookieOptions,
}

impl CookieStorage {
    pub fn new(options: CookieOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    fn cookie(&self, value: String) -> SetCookie {
        let options = &self.options;
        SetCookie {
            path: options.path.clone(),
            domain: options.domain.clone(),
            secure: options.secure,
            http_only: options.http_only,
            max_age: options.max_age,
            same_site: options.same_site,
            ..SetCookie::new(options.name.clone(), value)
        }
    }
}

#[async_trait]
impl Storage for CookieStorage {
    async fn read(&self, request: &AuthRequest) -> Option<Value> {
        let raw = request.cookie(&self.options.name)?;
        if raw.is_empty() {
            return None;
        }
        Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    }

    async fn write(
        &self,
        _request: &AuthRequest,
        response: AuthResponse,
        value: Value,
    ) -> Result<AuthResponse, StorageError> {
        let encoded =
            serde_json::to_string(&value).map_err(|e| StorageError::Encode(e.to_string()))?;
        Ok(response.with_added_header("set-cookie", self.cookie(encoded).to_header_value()))
    }

    async fn clear(
        &self,
        _request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, StorageError> {
        let cookie = self.cookie(String::new()).expired();
        Ok(response.with_added_header("set-cookie", cookie.to_header_value()))
    }
}
