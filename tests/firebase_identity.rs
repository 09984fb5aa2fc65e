//! Integration tests for the Identity Toolkit REST client against a mock
//! server.

use std::sync::Arc;
use std::time::Duration;

use backoffice_core::{CredentialExchange, Error, FirebaseIdentity, IdentityBackend};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn successful_sign_in_returns_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "email": "staff@example.org",
            "password": "secret",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "id-token-1",
            "refreshToken": "refresh-1",
            "localId": "uid-1",
            "email": "staff@example.org",
            "expiresIn": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = FirebaseIdentity::new("test-key").with_endpoint(server.uri());
    let token = identity
        .sign_in_with_password("staff@example.org", "secret")
        .await
        .unwrap();

    assert_eq!(token.id_token, "id-token-1");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(token.user_id, "uid-1");
    assert_eq!(token.expires_in, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
        })))
        .mount(&server)
        .await;

    let identity = FirebaseIdentity::new("test-key").with_endpoint(server.uri());
    let err = identity
        .sign_in_with_password("staff@example.org", "wrong")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::Authentication("INVALID_LOGIN_CREDENTIALS".into())
    );
}

#[tokio::test]
async fn exchange_builds_session_from_rest_response() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "id-token-2",
            "localId": "uid-2",
            "email": "staff@example.org"
        })))
        .mount(&server)
        .await;

    let identity = FirebaseIdentity::new("test-key").with_endpoint(format!("{}/", server.uri()));
    let exchange = CredentialExchange::new(Arc::new(identity));
    let session = exchange
        .sign_in("  staff@example.org ", "secret")
        .await
        .unwrap();

    assert_eq!(session.token(), "id-token-2");
    assert_eq!(session.user_id(), "uid-2");
    assert_eq!(session.expires_at(), None);
}

#[tokio::test]
async fn unreachable_endpoint_is_an_authentication_error() {
    let identity = FirebaseIdentity::new("test-key").with_endpoint("http://127.0.0.1:9");
    let err = identity
        .sign_in_with_password("staff@example.org", "secret")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
}
