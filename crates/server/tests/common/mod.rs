//! Common test utilities for E2E testing.
//!
//! This module provides a test fixture that creates an in-process server
//! over the fixture users, enabling end-to-end authentication tests
//! without binding a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use gatehouse_core::{config::ResolverConfig, load_config_from_str, validate_config};
use gatehouse_server::state::AppState;

/// Re-export fixtures for test convenience
pub use gatehouse_core::testing::fixtures;

/// Secret shared by the JWT authenticator of [`TestConfig::full`].
pub const JWT_SECRET: &str = "e2e-jwt-secret";

/// Test fixture for E2E testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/login", json!({
///         "username": "mariano",
///         "password": "password"
///     }), &[]).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for inspecting the session store
    pub state: Arc<AppState>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `name=value` pairs of every `Set-Cookie` header.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(gatehouse_core::http::parse_set_cookie)
            .collect()
    }

    /// The `name=value` pair of cookie `name` as sent, ready for a `Cookie` header.
    pub fn cookie_header(&self, name: &str) -> Option<String> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.split_once('=').is_some_and(|(key, _)| key == name))
            .map(str::to_string)
    }
}

impl TestFixture {
    /// Create a new test fixture with every authenticator configured.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::full()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let mut config = load_config_from_str(&test_config.toml).expect("Failed to parse config");
        config.resolver = ResolverConfig::Memory {
            users: fixtures::user_records(),
        };
        validate_config(&config).expect("Invalid test config");

        let state = Arc::new(AppState::from_config(config).expect("Failed to build state"));
        let router = gatehouse_server::api::create_router(Arc::clone(&state));

        Self { router, state }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, headers, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value, headers: &[(&str, &str)]) -> TestResponse {
        let body = serde_json::to_string(&body).unwrap();
        let mut headers = headers.to_vec();
        headers.push(("Content-Type", "application/json"));
        self.request("POST", path, &headers, Some(body)).await
    }

    /// Send a POST request with an urlencoded form body.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(form).unwrap();
        self.request(
            "POST",
            path,
            &[("Content-Type", "application/x-www-form-urlencoded")],
            Some(body),
        )
        .await
    }

    /// Send a request to the test server.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }
        let body = body.map(Body::from).unwrap_or_else(Body::empty);
        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Config TOML; the resolver is always replaced by the fixture users.
    pub toml: String,
}

impl TestConfig {
    /// Session, form, remember-me cookie, token and JWT authenticators.
    pub fn full() -> Self {
        Self {
            toml: format!(
                r#"
[service]
unauthenticated_redirect = "/login"
query_param = "redirect"

[[authenticators]]
type = "session"

[[authenticators]]
type = "form"
login_url = ["/api/v1/login"]

[authenticators.identifier]
type = "password"
username_fields = ["username", "email"]

[[authenticators]]
type = "cookie"
salt = "e2e"
login_url = ["/api/v1/login"]

[[authenticators]]
type = "token"
header = "x-api-token"
query_param = "api_token"

[[authenticators]]
type = "jwt"
secret = "{JWT_SECRET}"
return_payload = false
"#
            ),
        }
    }

    /// HTTP Basic only, so unauthenticated requests are challenged.
    pub fn basic() -> Self {
        Self {
            toml: r#"
[[authenticators]]
type = "http_basic"
realm = "e2e"
"#
            .to_string(),
        }
    }
}
