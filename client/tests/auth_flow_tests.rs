mod common;

use std::time::Duration;

use client::{AuthState, ClientError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{authorization, config_for, requests_to, test_client, test_client_with};

async fn mount_register(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "Verification code sent"
        })))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "email": "e1@x.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "id": "u1",
            "username": "u1",
            "email": "e1@x.com"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_register_verify_login_sequence() {
    let server = MockServer::start().await;
    mount_register(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-email"))
        .and(body_partial_json(json!({ "code": "000000" })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid or expired code" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-email"))
        .and(body_partial_json(json!({ "email": "e1@x.com", "code": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "tok-verified", "_id": "u1", "username": "u1", "email": "e1@x.com" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let auth = client.auth();

    let state = auth.register("u1", "e1@x.com", "p1").await.unwrap();
    assert_eq!(
        state,
        AuthState::Registered {
            pending_email: "e1@x.com".to_string()
        }
    );
    assert!(client.session().get().token().is_none());

    let err = auth.verify("000000").await.unwrap_err();
    assert!(matches!(err, ClientError::Verification(ref msg) if msg == "Invalid or expired code"));
    assert_eq!(auth.state().pending_email(), Some("e1@x.com"));

    let state = auth.verify("123456").await.unwrap();
    match state {
        AuthState::LoggedIn(user) => {
            assert_eq!(user.id, "u1");
            assert_eq!(user.email, "e1@x.com");
        }
        other => panic!("expected LoggedIn, got {:?}", other),
    }
    assert_eq!(client.session().get().token(), Some("tok-verified"));
    assert_eq!(client.session().get().user_id(), Some("u1"));
}

#[tokio::test]
async fn test_verify_without_token_requires_login() {
    let server = MockServer::start().await;
    mount_register(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-email"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Email verified" })),
        )
        .mount(&server)
        .await;
    mount_login(&server, "tok-login").await;

    let client = test_client(&server);
    let auth = client.auth();

    auth.register("u1", "e1@x.com", "p1").await.unwrap();
    let state = auth.verify("123456").await.unwrap();
    assert_eq!(
        state,
        AuthState::Verified {
            email: "e1@x.com".to_string()
        }
    );
    assert!(client.session().get().token().is_none());

    let state = auth.login("e1@x.com", "p1").await.unwrap();
    assert!(state.is_logged_in());
    assert_eq!(client.session().get().token(), Some("tok-login"));
}

#[tokio::test]
async fn test_register_rejection_is_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Email already in use" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.auth().register("u1", "e1@x.com", "p1").await.unwrap_err();

    assert!(matches!(err, ClientError::Validation(ref msg) if msg == "Email already in use"));
    assert_eq!(client.auth().state(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_login_failure_leaves_session_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.session().set("previous", Some("u0")).unwrap();

    let err = client.auth().login("e1@x.com", "bad").await.unwrap_err();
    assert!(matches!(err, ClientError::Auth(ref msg) if msg == "Invalid credentials"));
    assert_eq!(client.session().get().token(), Some("previous"));
}

#[tokio::test]
async fn test_login_without_token_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "username": "u1",
            "email": "e1@x.com"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.auth().login("e1@x.com", "p1").await.unwrap_err();

    assert!(matches!(err, ClientError::Auth(ref msg) if msg == "No token returned by backend."));
    assert!(client.session().get().token().is_none());
    assert_eq!(client.auth().state(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_login_twice_requires_logout() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    let client = test_client(&server);
    client.auth().login("e1@x.com", "p1").await.unwrap();

    let err = client.auth().login("e1@x.com", "p1").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn test_logout_drops_credential_from_requests() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "No token" })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.auth().login("e1@x.com", "p1").await.unwrap();
    assert!(client.auth().state().is_logged_in());

    assert_eq!(client.auth().logout(), AuthState::Anonymous);
    assert!(client.session().get().token().is_none());
    assert_eq!(client.auth().state(), AuthState::Anonymous);

    let err = client.api().me().await.unwrap_err();
    assert!(err.is_auth_expired());

    let seen = requests_to(&server, "/api/users/me").await;
    assert_eq!(seen.len(), 1);
    assert_eq!(authorization(&seen[0]), None);
}

#[tokio::test]
async fn test_expired_session_drops_to_anonymous() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;
    Mock::given(method("GET"))
        .and(path("/api/account/balance"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.auth().login("e1@x.com", "p1").await.unwrap();

    assert!(client.api().balance().await.unwrap_err().is_auth_expired());
    assert_eq!(client.auth().state(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_restore_fetches_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "_id": "u9", "username": "neo", "email": "neo@x.com", "role": "admin" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.session().set("persisted", None).unwrap();

    match client.auth().restore().await.unwrap() {
        AuthState::LoggedIn(user) => {
            assert_eq!(user.id, "u9");
            assert!(user.is_admin());
        }
        other => panic!("expected LoggedIn, got {:?}", other),
    }
    assert_eq!(client.session().get().user_id(), Some("u9"));
    assert!(client.auth().require_admin().is_ok());
}

#[tokio::test]
async fn test_restore_failure_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.session().set("persisted", Some("u1")).unwrap();

    assert_eq!(client.auth().restore().await.unwrap(), AuthState::Anonymous);
    assert!(client.session().get().token().is_none());
}

#[tokio::test]
async fn test_restore_timeout_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "_id": "u1", "email": "e1@x.com" }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.timeout_ms = 100;
    let client = test_client_with(config);
    client.session().set("persisted", Some("u1")).unwrap();

    let err = client.auth().restore().await.unwrap_err();
    assert!(matches!(err, ClientError::Network { timeout: true, .. }));
    assert!(!client.auth().state().is_logged_in());
    assert_eq!(client.session().get().token(), Some("persisted"));
    assert_eq!(client.session().get().user_id(), Some("u1"));
}

#[tokio::test]
async fn test_restore_without_session_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert_eq!(client.auth().restore().await.unwrap(), AuthState::Anonymous);
}
