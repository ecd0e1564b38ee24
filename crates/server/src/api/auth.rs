//! Login, logout and identity endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use gatehouse_core::{AuthStatus, Identity};
use serde::Serialize;
use serde_json::{json, Value};

use super::middleware::{AuthContext, AuthUser, ClearIdentity};

/// Fields never echoed back to clients.
const HIDDEN_FIELDS: &[&str] = &["password", "ha1"];

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
    pub authenticator: Option<String>,
    pub status: Option<AuthStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Identity data safe to return to the client.
pub fn public_identity(identity: &Identity) -> Value {
    let mut data = identity.original_data().clone();
    for field in HIDDEN_FIELDS {
        data.remove(*field);
    }
    Value::Object(data)
}

/// Report the outcome of authenticating the login request.
///
/// Persistence of a successful login happens in the middleware once this
/// handler returns.
pub async fn login(Extension(context): Extension<AuthContext>) -> (StatusCode, Json<LoginResponse>) {
    let status = if context.authenticated {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    let body = LoginResponse {
        authenticated: context.authenticated,
        authenticator: context.authenticator,
        status: context.status,
        errors: context.errors,
        identity: context.identity.as_deref().map(public_identity),
        redirect: context.login_redirect,
    };
    (status, Json(body))
}

/// Drop the persisted identity.
pub async fn logout() -> Response {
    let mut response = Json(json!({ "logged_out": true })).into_response();
    response.extensions_mut().insert(ClearIdentity);
    response
}

pub async fn me(AuthUser(identity): AuthUser) -> Json<Value> {
    Json(json!({
        "id": identity.identifier(),
        "identity": public_identity(&identity),
    }))
}
