//! Authentication lifecycle integration tests.
//!
//! These tests drive the service through a full login sequence:
//! form login -> persistence (session + remember-me cookie) -> session
//! resume -> cookie-only resume -> logout

use std::sync::Arc;

use serde_json::json;

use gatehouse_core::{
    auth::{
        CookieAuthenticator, FormAuthenticator, HttpBasicAuthenticator, JwtAuthenticator,
        JwtOptions, SessionAuthenticator,
    },
    http::{parse_set_cookie, SERVER_AUTH_PW, SERVER_AUTH_USER},
    testing::fixtures,
    AuthError, AuthRequest, AuthResponse, AuthStatus, AuthenticationService,
    AuthenticatorCollection, MemorySessionStore, Session, SessionStore,
};

/// Test helper wiring the real authenticators over the fixture users.
struct TestHarness {
    store: MemorySessionStore,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            store: MemorySessionStore::new(),
        }
    }

    fn service(&self) -> AuthenticationService {
        let collection = AuthenticatorCollection::new()
            .with(Arc::new(SessionAuthenticator::new(
                fixtures::password_identifier(),
            )))
            .with(Arc::new(
                FormAuthenticator::new(fixtures::password_identifier())
                    .with_login_url(vec!["/login".to_string()]),
            ))
            .with(Arc::new(
                CookieAuthenticator::new(fixtures::password_identifier())
                    .with_hasher(Arc::new(fixtures::hasher()))
                    .with_salt(Some("pepper".to_string())),
            ));
        AuthenticationService::new(collection)
    }

    fn session(&self, id: Option<&str>) -> Session {
        gatehouse_core::open_session(&self.store, id).expect("open session")
    }
}

fn remember_me_cookie(response: &AuthResponse) -> (String, String) {
    response
        .header_values("set-cookie")
        .into_iter()
        .filter_map(parse_set_cookie)
        .find(|(name, _)| name == "CookieAuth")
        .expect("remember-me cookie")
}

#[tokio::test]
async fn test_full_login_lifecycle() {
    let harness = TestHarness::new();

    // 1. Form login with remember-me
    let session = harness.session(None);
    let login = AuthRequest::new("POST", "/login")
        .with_body(json!({"username": "mariano", "password": "password", "remember_me": true}))
        .with_session(session.clone());

    let mut service = harness.service();
    assert!(service.authenticate(&login).await.unwrap());
    assert_eq!(service.successful_authenticator().unwrap().name(), "form");
    assert_eq!(service.failures().len(), 1);
    assert_eq!(service.failures()[0].authenticator.name(), "session");

    let persisted = service
        .persist_identity(&login, AuthResponse::new(), None)
        .await
        .unwrap();
    assert!(session.id_changed());
    assert_eq!(
        persisted.request.attributes["identity"]["username"],
        json!("mariano")
    );
    let (cookie_name, cookie_value) = remember_me_cookie(&persisted.response);
    session.commit(&harness.store).unwrap();

    // 2. Resume from the session alone
    let resumed = harness.session(Some(&session.id()));
    let request = AuthRequest::new("GET", "/dashboard").with_session(resumed);
    let mut service = harness.service();
    assert!(service.authenticate(&request).await.unwrap());
    assert_eq!(service.successful_authenticator().unwrap().name(), "session");
    let identity = service.identity().unwrap();
    assert_eq!(identity.identifier(), Some(&json!(1)));

    // 3. Fresh session, remember-me cookie only
    let request = AuthRequest::new("GET", "/dashboard")
        .with_session(harness.session(None))
        .with_cookie(&cookie_name, &cookie_value);
    let mut service = harness.service();
    assert!(service.authenticate(&request).await.unwrap());
    assert_eq!(service.successful_authenticator().unwrap().name(), "cookie");

    // 4. Logout clears both the session key and the cookie
    let cleared = service
        .clear_identity(&request, AuthResponse::new())
        .await
        .unwrap();
    assert!(service.identity().is_none());
    assert!(cleared
        .response
        .header_values("set-cookie")
        .iter()
        .any(|v| v.starts_with("CookieAuth=;")));
    assert!(!request.session().unwrap().check("Auth"));
}

#[tokio::test]
async fn test_wrong_password_reports_every_failure() {
    let harness = TestHarness::new();
    let request = AuthRequest::new("POST", "/login")
        .with_body(json!({"username": "mariano", "password": "nope"}))
        .with_session(harness.session(None));

    let mut service = harness.service();
    assert!(!service.authenticate(&request).await.unwrap());
    assert!(service.identity().is_none());

    let statuses: Vec<(String, AuthStatus)> = service
        .failures()
        .iter()
        .map(|f| (f.authenticator.name().to_string(), f.result.status()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("session".to_string(), AuthStatus::FailureIdentityNotFound),
            ("form".to_string(), AuthStatus::FailureIdentityNotFound),
            ("cookie".to_string(), AuthStatus::FailureCredentialsMissing),
        ]
    );
    assert_eq!(
        service.result().unwrap().status(),
        AuthStatus::FailureCredentialsMissing
    );
}

#[tokio::test]
async fn test_stateless_challenge_stops_the_run() {
    let collection = AuthenticatorCollection::new()
        .with(Arc::new(
            HttpBasicAuthenticator::new(fixtures::password_identifier())
                .with_realm(Some("gatehouse".to_string())),
        ))
        .with(Arc::new(
            JwtAuthenticator::new(fixtures::jwt_subject_identifier(), JwtOptions::new("secret"))
                .unwrap(),
        ));
    let mut service = AuthenticationService::new(collection);

    let request = AuthRequest::new("GET", "/api");
    let challenge = match service.authenticate(&request).await {
        Err(AuthError::Challenge(challenge)) => challenge,
        other => panic!("expected challenge, got {:?}", other.map_err(|e| e.to_string())),
    };
    assert_eq!(challenge.status, 401);
    assert_eq!(
        challenge.header("WWW-Authenticate"),
        Some("Basic realm=\"gatehouse\"")
    );
    assert!(service.failures().is_empty());

    let request = AuthRequest::new("GET", "/api")
        .with_server_var(SERVER_AUTH_USER, "robert")
        .with_server_var(SERVER_AUTH_PW, "robert");
    assert!(service.authenticate(&request).await.unwrap());
    assert_eq!(
        service.identity().unwrap().get("username"),
        Some(&json!("robert"))
    );
}

#[tokio::test]
async fn test_session_store_survives_commit_and_destroy() {
    let harness = TestHarness::new();
    let session = Session::start();
    session.write("Auth", json!({"id": 2, "username": "robert"}));
    session.commit(&harness.store).unwrap();

    let loaded = harness.store.load(&session.id()).unwrap().unwrap();
    assert_eq!(loaded["Auth"]["username"], json!("robert"));

    harness.store.destroy(&session.id()).unwrap();
    assert!(harness.store.load(&session.id()).unwrap().is_none());
}
