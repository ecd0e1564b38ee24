//! Authentication and metrics middleware for API routes.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use gatehouse_core::http::{SameSite, SetCookie, SERVER_AUTH_PW, SERVER_AUTH_USER, SERVER_NAME};
use gatehouse_core::{
    open_session, AuthError, AuthRequest, AuthResponse, AuthStatus, Challenge, Identity, Session,
    SessionError,
};

use crate::metrics::{
    normalize_path, AUTH_ATTEMPTS_TOTAL, AUTH_FAILURES_TOTAL, CHALLENGES_TOTAL,
    HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Largest request body buffered for credential extraction.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server variable holding the request method.
const SERVER_REQUEST_METHOD: &str = "REQUEST_METHOD";

/// Outcome of authentication, available to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub authenticated: bool,
    /// Name of the authenticator that succeeded.
    pub authenticator: Option<String>,
    pub status: Option<AuthStatus>,
    pub errors: Vec<String>,
    pub identity: Option<Arc<Identity>>,
    /// Where to send the client when a handler requires an identity.
    pub unauthenticated_redirect: Option<String>,
    /// Local target requested for after login.
    pub login_redirect: Option<String>,
}

/// Response extension asking the middleware to clear the persisted identity.
#[derive(Debug, Clone, Copy)]
pub struct ClearIdentity;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware running the authentication service.
///
/// The request is never rejected for lack of credentials: the outcome is
/// attached as an [`AuthContext`] and handlers that need an identity use the
/// [`AuthUser`] extractor. Challenges raised by stateless authenticators are
/// returned as-is. After the handler, the identity is persisted (or cleared
/// when the handler returned [`ClearIdentity`]) and the session committed.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    let mut auth_request = build_auth_request(&parts, &bytes);
    let session_id = auth_request.cookie(&state.config().session.cookie_name);
    let session = match open_session(state.session_store(), session_id.as_deref()) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to open session");
            AUTH_FAILURES_TOTAL.with_label_values(&["session"]).inc();
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable");
        }
    };
    auth_request.session = Some(session.clone());

    let mut service = state.service();
    let authenticated = match service.authenticate(&auth_request).await {
        Ok(authenticated) => authenticated,
        Err(AuthError::Challenge(challenge)) => {
            debug!(path = %auth_request.path, "Issuing authentication challenge");
            CHALLENGES_TOTAL.inc();
            return challenge_response(&challenge);
        }
        Err(e) => {
            error!(error = %e, "Authentication failed");
            AUTH_FAILURES_TOTAL
                .with_label_values(&["internal_error"])
                .inc();
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication unavailable",
            );
        }
    };

    let authenticator = service
        .successful_authenticator()
        .map(|a| a.name().to_string());
    let status = service.result().map(|r| r.status());
    AUTH_ATTEMPTS_TOTAL
        .with_label_values(&[
            authenticator.as_deref().unwrap_or("none"),
            status.map(|s| s.as_str()).unwrap_or("NONE"),
        ])
        .inc();

    let context = AuthContext {
        authenticated,
        authenticator,
        status,
        errors: service
            .result()
            .map(|r| r.errors().to_vec())
            .unwrap_or_default(),
        identity: service.identity(),
        unauthenticated_redirect: if authenticated {
            None
        } else {
            service.unauthenticated_redirect_url(&auth_request)
        },
        login_redirect: if authenticated {
            service.login_redirect(&auth_request)
        } else {
            None
        },
    };

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(context);
    let mut response = next.run(request).await;

    let clear = response.extensions().get::<ClearIdentity>().is_some();
    let persist = authenticated
        && service
            .successful_authenticator()
            .is_some_and(|a| a.as_stateless().is_none());
    let outcome = if clear {
        Some(service.clear_identity(&auth_request, AuthResponse::new()).await)
    } else if persist {
        Some(
            service
                .persist_identity(&auth_request, AuthResponse::new(), None)
                .await,
        )
    } else {
        None
    };
    match outcome {
        Some(Ok(result)) => append_headers(response.headers_mut(), &result.response.headers),
        Some(Err(e)) => {
            error!(error = %e, "Failed to update persisted identity");
            AUTH_FAILURES_TOTAL.with_label_values(&["persistence"]).inc();
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Persistence failed");
        }
        None => {}
    }

    if let Err(e) = commit_session(&state, &session, response.headers_mut()) {
        error!(error = %e, "Failed to commit session");
        AUTH_FAILURES_TOTAL.with_label_values(&["session"]).inc();
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable");
    }
    response
}

/// Translate an HTTP request into the authentication layer's request model.
///
/// Basic credentials are exposed as the `AUTH_USER` / `AUTH_PW` server
/// variables, JSON and urlencoded bodies become the parsed body.
pub fn build_auth_request(parts: &Parts, body: &Bytes) -> AuthRequest {
    let host = header_str(&parts.headers, header::HOST.as_str()).unwrap_or("localhost");
    let scheme = header_str(&parts.headers, "x-forwarded-proto").unwrap_or("http");

    let mut request =
        AuthRequest::new(parts.method.as_str(), parts.uri.path()).with_host(scheme, host);
    if let Some(query) = parts.uri.query() {
        request = request.with_query(query);
    }

    for (name, value) in parts.headers.iter() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let name = name.as_str().to_lowercase();
        let merged = match request.headers.remove(&name) {
            Some(existing) if name == "cookie" => format!("{}; {}", existing, value),
            Some(existing) => format!("{}, {}", existing, value),
            None => value.to_string(),
        };
        request.headers.insert(name, merged);
    }
    request.body = parse_body(&parts.headers, body);

    let server_name = host.rsplit_once(':').map_or(host, |(name, _)| name);
    request = request
        .with_server_var(SERVER_NAME, server_name)
        .with_server_var(SERVER_REQUEST_METHOD, parts.method.as_str());
    if let Some((username, password)) = basic_credentials(&parts.headers) {
        request = request
            .with_server_var(SERVER_AUTH_USER, username)
            .with_server_var(SERVER_AUTH_PW, password);
    }
    request
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_body(headers: &HeaderMap, body: &Bytes) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    let content_type = header_str(headers, header::CONTENT_TYPE.as_str()).unwrap_or_default();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
        let fields: Map<String, Value> = pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        return Some(Value::Object(fields));
    }
    serde_json::from_slice(body).ok()
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Save the session and hand its id to the client when it changed.
///
/// Fresh sessions that never received data are dropped. A resumed session
/// that was emptied is destroyed and its cookie expired.
fn commit_session(
    state: &AppState,
    session: &Session,
    headers: &mut HeaderMap,
) -> Result<(), SessionError> {
    if session.is_new() && session.is_empty() {
        return Ok(());
    }
    let changed = session.id_changed();
    let stored = session.commit(state.session_store())?;

    if changed || !stored {
        let config = &state.config().session;
        let mut cookie = SetCookie {
            secure: config.secure,
            http_only: true,
            same_site: Some(SameSite::Lax),
            ..SetCookie::new(config.cookie_name.clone(), session.id())
        };
        if !stored {
            cookie = cookie.expired();
        }
        append_headers(
            headers,
            &[("set-cookie".to_string(), cookie.to_header_value())],
        );
    }
    Ok(())
}

fn challenge_response(challenge: &Challenge) -> Response {
    let status = StatusCode::from_u16(challenge.status).unwrap_or(StatusCode::UNAUTHORIZED);
    let mut response = (status, challenge.body.clone()).into_response();
    append_headers(response.headers_mut(), &challenge.headers);
    response
}

fn append_headers(target: &mut HeaderMap, headers: &[(String, String)]) {
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                target.append(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn unauthenticated_response(context: &AuthContext) -> Response {
    match &context.unauthenticated_redirect {
        Some(url) => (StatusCode::FOUND, [(header::LOCATION, url.clone())]).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Authentication required",
                "status": context.status,
                "errors": context.errors,
            })),
        )
            .into_response(),
    }
}

/// Extractor for the authenticated identity.
///
/// Rejects with a redirect to the configured unauthenticated URL, or with
/// 401 when none is configured.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Arc<Identity>);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = match parts.extensions.get::<AuthContext>() {
            Some(AuthContext {
                identity: Some(identity),
                ..
            }) => Ok(AuthUser(identity.clone())),
            Some(context) => Err(unauthenticated_response(context)),
            None => Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Authentication required",
            )),
        };
        std::future::ready(result)
    }
}
