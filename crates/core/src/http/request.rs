use serde_json::Value;
use std::collections::HashMap;

use super::cookie::parse_cookie_header;
use crate::session::Session;

/// Server variable holding the HTTP Basic username.
pub const SERVER_AUTH_USER: &str = "AUTH_USER";
/// Server variable holding the HTTP Basic password.
pub const SERVER_AUTH_PW: &str = "AUTH_PW";
/// Server variable holding a raw digest credential string.
pub const SERVER_AUTH_DIGEST: &str = "AUTH_DIGEST";
/// Server variable holding the host name the request was addressed to.
pub const SERVER_NAME: &str = "SERVER_NAME";
/// Server variable holding the method before any method override.
pub const SERVER_ORIGINAL_REQUEST_METHOD: &str = "ORIGINAL_REQUEST_METHOD";

/// Request information for authentication.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    pub query_params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub server: HashMap<String, String>,
    pub session: Option<Session>,
    pub attributes: HashMap<String, Value>,
}

impl Default for AuthRequest {
    fn default() -> Self {
        Self::new("GET", "/")
    }
}

impl AuthRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            path: path.into(),
            query: None,
            query_params: HashMap::new(),
            headers: HashMap::new(),
            body: None,
            server: HashMap::new(),
            session: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Set the raw query string and parse it into `query_params`.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            let value = decode_component(value);
            self.query_params.insert(key, value);
        }
        self.query = Some(query);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_server_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server.insert(name.into(), value.into());
        self
    }

    pub fn with_host(mut self, scheme: impl Into<String>, host: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self.host = host.into();
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Add a cookie to the `cookie` header.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        let pair = format!("{}={}", name, urlencoding::encode(value));
        let header = match self.headers.remove("cookie") {
            Some(existing) if !existing.is_empty() => format!("{}; {}", existing, pair),
            _ => pair,
        };
        self.headers.insert("cookie".to_string(), header);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn server_var(&self, name: &str) -> Option<&str> {
        self.server.get(name).map(String::as_str)
    }

    /// Look up a cookie value (URL-decoded) from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.header("cookie")?;
        parse_cookie_header(header)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Look up a body value by dotted path, e.g. `user.email`.
    pub fn body_value(&self, path: &str) -> Option<&Value> {
        let mut current = self.body.as_ref()?;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Scheme, host and path, without query string.
    pub fn full_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }

    /// Path with the query string appended when present.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }

    /// The full request URI as a string, used in diagnostics.
    pub fn uri_string(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path_and_query())
    }
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}
