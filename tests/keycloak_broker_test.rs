//! Keycloak adapter driven through the session controller, with the realm
//! served by wiremock.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use sso_session::broker::{KeycloakBroker, RecordingNavigator, TokenSet};
use sso_session::config::{BrokerConfig, SessionConfig};
use sso_session::session::{SessionController, SessionState};
use sso_session::SessionError;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REALM: &str = "demo-sso-realm";

fn access_token(expires_in: i64) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": "f1c2",
            "exp": Utc::now().timestamp() + expires_in,
            "name": "Ada Lovelace",
            "realm_access": { "roles": ["student"] }
        }),
        &EncodingKey::from_secret(b"realm-test-secret"),
    )
    .unwrap()
}

fn broker_config(server: &MockServer) -> BrokerConfig {
    BrokerConfig {
        url: server.uri(),
        realm: REALM.to_string(),
        client_id: "react-app".to_string(),
        ..BrokerConfig::default()
    }
}

async fn mount_discovery(server: &MockServer) {
    let realm = format!("{}/realms/{}/protocol/openid-connect", server.uri(), REALM);
    Mock::given(method("GET"))
        .and(path(format!(
            "/realms/{}/.well-known/openid-configuration",
            REALM
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": format!("{}/realms/{}", server.uri(), REALM),
            "authorization_endpoint": format!("{}/auth", realm),
            "token_endpoint": format!("{}/token", realm),
            "end_session_endpoint": format!("{}/logout", realm),
            "jwks_uri": format!("{}/certs", realm)
        })))
        .mount(server)
        .await;
}

fn token_path() -> String {
    format!("/realms/{}/protocol/openid-connect/token", REALM)
}

fn controller_for(
    navigator: &Arc<RecordingNavigator>,
    tokens: Option<TokenSet>,
) -> SessionController {
    let mut broker = KeycloakBroker::new(navigator.clone());
    if let Some(tokens) = tokens {
        broker = broker.with_tokens(tokens);
    }
    SessionController::new(Arc::new(broker), SessionConfig::default())
}

fn seeded(expires_in: i64) -> TokenSet {
    TokenSet {
        access_token: access_token(expires_in),
        refresh_token: Some("refresh-1".to_string()),
        id_token: Some("id-1".to_string()),
    }
}

#[tokio::test]
async fn test_discovery_failure_fails_initialization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, None);

    let err = controller
        .initialize(&broker_config(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Initialization(_)));
    assert_eq!(controller.state(), SessionState::Uninitialized);
    assert!(navigator.visited().is_empty());
}

#[tokio::test]
async fn test_seeded_tokens_authenticate() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    let navigator = Arc::new(RecordingNavigator::new());
    let tokens = seeded(600);
    let controller = controller_for(&navigator, Some(tokens.clone()));

    let state = controller.initialize(&broker_config(&server)).await.unwrap();
    assert_eq!(state, SessionState::Authenticated);

    let session = controller.session();
    assert!(session.is_authenticated());
    assert_eq!(session.raw_token(), Some(tokens.access_token.as_str()));
    assert_eq!(session.claims().name(), Some("Ada Lovelace"));
    assert!(session.validity_remaining_secs().unwrap() > 500);
}

#[tokio::test]
async fn test_login_navigates_to_authorization_endpoint() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, None);
    let state = controller.initialize(&broker_config(&server)).await.unwrap();
    assert_eq!(state, SessionState::Unauthenticated);
    // check-sso does not redirect on its own
    assert!(navigator.visited().is_empty());

    controller.login().await.unwrap();
    let url = navigator.last().unwrap();
    assert!(url.path().ends_with("/protocol/openid-connect/auth"));

    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let value = |key: &str| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(value("client_id").as_deref(), Some("react-app"));
    assert_eq!(value("redirect_uri").as_deref(), Some("http://localhost:3000/"));
    assert_eq!(value("response_type").as_deref(), Some("code"));
    assert!(value("state").is_some());
    assert!(value("nonce").is_some());
}

#[tokio::test]
async fn test_logout_navigates_to_end_session_endpoint() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(600)));
    controller.initialize(&broker_config(&server)).await.unwrap();

    controller.logout().await.unwrap();
    assert_eq!(controller.state(), SessionState::Unauthenticated);
    assert!(!controller.session().is_authenticated());

    let url = navigator.last().unwrap();
    assert!(url.path().ends_with("/protocol/openid-connect/logout"));
    let query = url.query().unwrap_or_default().to_string();
    assert!(query.contains("id_token_hint=id-1"));
    assert!(query.contains("post_logout_redirect_uri="));
}

#[tokio::test]
async fn test_refresh_grant_stores_new_token() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    let renewed = access_token(3600);
    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": renewed,
            "refresh_token": "refresh-2",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(30)));
    controller.initialize(&broker_config(&server)).await.unwrap();

    assert!(controller.refresh_default().await.unwrap());
    let session = controller.session();
    assert_eq!(session.raw_token(), Some(renewed.as_str()));
    assert!(session.validity_remaining_secs().unwrap() > 3000);
}

#[tokio::test]
async fn test_rejected_refresh_resets_session() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Session not active"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(30)));
    controller.initialize(&broker_config(&server)).await.unwrap();

    match controller.refresh_default().await {
        Err(SessionError::Refresh(reason)) => assert!(reason.contains("Session not active")),
        other => panic!("unexpected refresh outcome: {:?}", other),
    }
    assert_eq!(controller.state(), SessionState::Unauthenticated);
    assert!(controller.session().raw_token().is_none());
}

#[tokio::test]
async fn test_token_endpoint_not_called_while_valid() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(900)));
    controller.initialize(&broker_config(&server)).await.unwrap();

    assert!(!controller.refresh_default().await.unwrap());
}

#[tokio::test]
async fn test_expired_seed_is_renewed_during_init() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token(600)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(-60)));
    let state = controller.initialize(&broker_config(&server)).await.unwrap();
    assert_eq!(state, SessionState::Authenticated);
}

#[tokio::test]
async fn test_expired_seed_without_renewal_is_unauthenticated() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(-60)));
    let state = controller.initialize(&broker_config(&server)).await.unwrap();
    assert_eq!(state, SessionState::Unauthenticated);
    assert!(!controller.session().is_authenticated());
}

#[tokio::test]
async fn test_threshold_beyond_i64_still_refreshes() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    let renewed = access_token(3600);
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": renewed
        })))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(&navigator, Some(seeded(600)));
    controller.initialize(&broker_config(&server)).await.unwrap();

    let refreshed = controller
        .refresh(Duration::from_secs(u64::MAX))
        .await
        .unwrap();
    assert!(refreshed);
    assert_eq!(controller.session().raw_token(), Some(renewed.as_str()));
}

#[tokio::test]
async fn test_es512_seeded_token_authenticates() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    fn segment(json: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }
    let payload = json!({
        "sub": "f1c2",
        "exp": Utc::now().timestamp() + 600,
        "name": "Ada Lovelace"
    });
    let token = format!(
        "{}.{}.c2lnbmF0dXJl",
        segment(r#"{"alg":"ES512","typ":"JWT","kid":"realm-key"}"#),
        segment(&payload.to_string())
    );

    let navigator = Arc::new(RecordingNavigator::new());
    let controller = controller_for(
        &navigator,
        Some(TokenSet {
            access_token: token.clone(),
            refresh_token: None,
            id_token: None,
        }),
    );

    let state = controller.initialize(&broker_config(&server)).await.unwrap();
    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(controller.session().raw_token(), Some(token.as_str()));
    assert_eq!(controller.session().claims().name(), Some("Ada Lovelace"));
}
