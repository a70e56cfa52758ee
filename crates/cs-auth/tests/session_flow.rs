//! End-to-end tests for the request pipeline.
//!
//! A wiremock server stands in for the Campus API so the refresh, retry and
//! redirect behaviour can be observed without a real backend.

use std::sync::Arc;
use std::time::Duration;

use cs_auth::{
    ApiClient, ApiRequest, AuthConfig, AuthError, CookieTokenStore, MemoryTokenStore,
    MultipartPart, RefreshError, SessionBootstrap, SessionEvent, SessionPhase, TokenPair,
    TokenStore,
};
use reqwest::cookie::Jar;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> AuthConfig {
    AuthConfig::new(&format!("{}/api", server.uri())).unwrap()
}

/// Config pointing at a port nothing listens on
fn unreachable_config() -> AuthConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    AuthConfig::new(&format!("http://127.0.0.1:{}/api", port)).unwrap()
}

fn client_with(server: &MockServer, tokens: Option<TokenPair>) -> ApiClient {
    let store = match tokens {
        Some(pair) => MemoryTokenStore::with_tokens(pair),
        None => MemoryTokenStore::new(),
    };
    ApiClient::with_store(
        config_for(server),
        Arc::new(store),
        Arc::new(Jar::default()),
    )
    .unwrap()
}

async fn mount_quests(server: &MockServer, token: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({"quests": [{"id": 1}]}))
    } else {
        ResponseTemplate::new(status)
    };

    Mock::given(method("GET"))
        .and(path("/api/quests"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// Refresh pipeline
// ============================================================================

#[tokio::test]
async fn test_happy_path_sends_bearer_without_refresh() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 200).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let body: Value = client.get_json("/quests").await.unwrap();

    assert_eq!(body["quests"][0]["id"], 1);
    assert_eq!(client.refreshes_started(), 0);
}

#[tokio::test]
async fn test_single_401_refreshes_and_replays() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;
    mount_quests(&server, "A2", 200).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2", "refresh_token": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let mut events = client.subscribe();

    let body: Value = client.get_json("/quests").await.unwrap();
    assert_eq!(body["quests"][0]["id"], 1);

    assert_eq!(client.store().tokens(), Some(TokenPair::new("A2", "R2")));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;
    mount_quests(&server, "A2", 200).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"session": {"accessToken": "A2"}})),
        )
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    client.send(ApiRequest::get("quests")).await.unwrap();

    assert_eq!(client.store().tokens(), Some(TokenPair::new("A2", "R1")));
}

#[tokio::test]
async fn test_unrecoverable_refresh_clears_tokens_and_expires() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    client.set_current_path("/dashboard");
    let mut events = client.subscribe();

    let err = client.send(ApiRequest::get("quests")).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(matches!(
        err,
        AuthError::SessionExpired(RefreshError::Rejected { status }) if status == 401
    ));

    assert!(client.store().access_token().is_none());
    assert!(client.store().refresh_token().is_none());

    match events.try_recv().unwrap() {
        SessionEvent::Expired { redirect, .. } => {
            let redirect = redirect.expect("private page should redirect");
            assert_eq!(redirect.login_path, "/login");
            assert_eq!(redirect.return_to, "/dashboard");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_burst_shares_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/quests"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(5)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/quests"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quests": []})))
        .expect(5)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2", "refresh_token": "R2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.send(ApiRequest::get("quests")).await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }

    assert_eq!(client.refreshes_started(), 1);
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A2", "R2")));
}

#[tokio::test]
async fn test_second_401_after_replay_is_not_retried_again() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;
    mount_quests(&server, "A2", 401).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2", "refresh_token": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let err = client.send(ApiRequest::get("quests")).await.unwrap_err();

    assert!(matches!(err, AuthError::Unauthorized { .. }));
    // the refresh itself succeeded, so the new pair stays
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A2", "R2")));
}

#[tokio::test]
async fn test_auth_endpoints_are_never_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));

    let err = client
        .send(ApiRequest::post("auth/refresh"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized { .. }));

    let err = client.login("ada@school.test", "wrong").await.unwrap_err();
    match err {
        AuthError::Unauthorized { body_snippet } => assert_eq!(body_snippet, "bad credentials"),
        other => panic!("unexpected error {:?}", other),
    }

    assert_eq!(client.refreshes_started(), 0);
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A1", "R1")));
}

#[tokio::test]
async fn test_redirect_suppressed_on_login_page() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    client.set_current_path("/login");
    let mut events = client.subscribe();

    assert!(client.send(ApiRequest::get("quests")).await.is_err());

    match events.try_recv().unwrap() {
        SessionEvent::Expired { redirect, .. } => assert!(redirect.is_none()),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_late_401_after_failed_refresh_does_not_expire_twice() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;

    Mock::given(method("GET"))
        .and(path("/api/badges"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let mut events = client.subscribe();

    // sent with A1, answered only after the session is already gone
    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.send(ApiRequest::get("badges")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = client.send(ApiRequest::get("quests")).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::SessionExpired(RefreshError::Rejected { .. })
    ));

    let late = slow.await.unwrap().unwrap_err();
    assert!(matches!(
        late,
        AuthError::SessionExpired(RefreshError::SessionCleared)
    ));

    assert_eq!(client.refreshes_started(), 1);
    assert!(matches!(
        events.try_recv().unwrap(),
        SessionEvent::Expired { .. }
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_refresh_token_expires_without_calling_server() {
    let server = MockServer::start().await;
    mount_quests(&server, "A1", 401).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::access_only("A1")));
    let err = client.send(ApiRequest::get("quests")).await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::SessionExpired(RefreshError::MissingRefreshToken)
    ));
    assert!(client.store().tokens().is_none());
}

#[tokio::test]
async fn test_csrf_rejection_is_propagated_not_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/badges"))
        .respond_with(ResponseTemplate::new(403).set_body_string("CSRF token missing"))
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let err = client
        .send(ApiRequest::post("badges").json(&json!({"name": "Explorer"})).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
    assert_eq!(client.refreshes_started(), 0);
}

#[tokio::test]
async fn test_network_error_keeps_tokens() {
    let config = unreachable_config();

    let client = ApiClient::with_store(
        config,
        Arc::new(MemoryTokenStore::with_tokens(TokenPair::new("A1", "R1"))),
        Arc::new(Jar::default()),
    )
    .unwrap();

    let err = client.send(ApiRequest::get("quests")).await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A1", "R1")));
    assert_eq!(client.refreshes_started(), 0);
}

// ============================================================================
// Request decoration
// ============================================================================

#[tokio::test]
async fn test_csrf_header_only_on_state_changing_requests() {
    let server = MockServer::start().await;

    Mock::given(path("/api/badges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_with(&server, None);
    client.csrf().pin(Some("meta-token".to_string()));

    client.send(ApiRequest::get("badges")).await.unwrap();
    client
        .send(ApiRequest::post("badges").json(&json!({})).unwrap())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let get = &requests[0];
    assert_eq!(get.method.as_str(), "GET");
    assert!(get.headers.get("x-csrf-token").is_none());
    assert!(get.headers.get("authorization").is_none());

    let post = &requests[1];
    assert_eq!(post.method.as_str(), "POST");
    assert_eq!(post.headers.get("x-csrf-token").unwrap(), "meta-token");
}

#[tokio::test]
async fn test_issued_csrf_token_is_reused() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrfToken": "issued-1"})))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/quests/3"))
        .and(header("x-csrf-token", "issued-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    assert_eq!(client.fetch_csrf_token().await.unwrap(), "issued-1");

    let response = client.delete("quests/3").await.unwrap();
    assert_eq!(response.status, 204);
}

#[tokio::test]
async fn test_multipart_upload_gets_boundary_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/uploads/roster"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let request = ApiRequest::post("uploads/roster")
        .header("Content-Type", "application/json")
        .unwrap()
        .multipart(vec![
            MultipartPart::Text {
                name: "school".to_string(),
                value: "north".to_string(),
            },
            MultipartPart::File {
                name: "file".to_string(),
                file_name: "roster.csv".to_string(),
                mime: Some("text/csv".to_string()),
                data: b"name\nAda\n".to_vec(),
            },
        ]);

    client.send(request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
}

// ============================================================================
// Login / logout
// ============================================================================

#[tokio::test]
async fn test_login_stores_tokens_and_announces() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "ada@school.test", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "user": {"id": 12, "email": "ada@school.test", "role": "student"}
        })))
        .mount(&server)
        .await;

    let client = client_with(&server, None);
    let mut events = client.subscribe();

    let user = client
        .login("ada@school.test", "secret")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.id, "12");
    assert_eq!(user.role.as_deref(), Some("student"));
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A1", "R1")));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Authenticated);
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let mut events = client.subscribe();

    client.logout().await;

    assert!(client.store().tokens().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);

    // later requests go out without credentials
    Mock::given(method("GET"))
        .and(path("/api/quests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    client.send(ApiRequest::get("quests")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests.last().unwrap().headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_logout_with_unreachable_server_still_succeeds() {
    let config = unreachable_config();

    let client = ApiClient::with_store(
        config,
        Arc::new(MemoryTokenStore::with_tokens(TokenPair::new("A1", "R1"))),
        Arc::new(Jar::default()),
    )
    .unwrap();

    client.logout().await;
    assert!(client.store().tokens().is_none());
}

// ============================================================================
// Cookie-delegated credentials
// ============================================================================

#[tokio::test]
async fn test_cookie_mode_refresh_relies_on_cookies() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    let jar = Arc::new(Jar::default());
    jar.add_cookie_str("access_token=A1; Path=/", &config.origin());

    Mock::given(method("GET"))
        .and(path("/api/quests"))
        .and(header("cookie", "access_token=A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quests": []})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/quests"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "access_token=A2; Path=/; HttpOnly")
                .set_body_json(json!({"message": "refreshed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(CookieTokenStore::new(jar.clone(), config.origin()));
    assert!(store.restore_tokens().await);

    let client = ApiClient::with_store(config, store, jar).unwrap();
    let response = client.send(ApiRequest::get("quests")).await.unwrap();
    assert_eq!(response.status, 200);

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|request| request.headers.get("authorization").is_none())
    );
}

// ============================================================================
// Session bootstrap
// ============================================================================

#[tokio::test]
async fn test_bootstrap_without_session_is_anonymous() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let bootstrap = SessionBootstrap::new(client_with(&server, None));
    let status_rx = bootstrap.status();
    assert!(status_rx.borrow().loading);

    let status = bootstrap.run().await;
    assert!(!status.loading);
    assert_eq!(status.phase, SessionPhase::Anonymous);
    assert!(!status_rx.borrow().loading);
}

#[tokio::test]
async fn test_bootstrap_restores_valid_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "u-7", "email": "parent@home.test", "role": "parent"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let mut events = client.subscribe();
    let bootstrap = SessionBootstrap::new(client);

    let status = bootstrap.run().await;
    assert!(status.is_authenticated());
    assert_eq!(status.user().unwrap().id, "u-7");
    assert_eq!(bootstrap.current(), status);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Authenticated);
}

#[tokio::test]
async fn test_bootstrap_invalid_session_clears_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let bootstrap = SessionBootstrap::new(client.clone());

    let status = bootstrap.run().await;
    assert!(!status.loading);
    assert_eq!(status.phase, SessionPhase::Anonymous);
    assert!(client.store().tokens().is_none());
}

#[tokio::test]
async fn test_bootstrap_unreachable_server_keeps_tokens() {
    let config = unreachable_config();

    let client = ApiClient::with_store(
        config,
        Arc::new(MemoryTokenStore::with_tokens(TokenPair::new("A1", "R1"))),
        Arc::new(Jar::default()),
    )
    .unwrap();
    let bootstrap = SessionBootstrap::new(client.clone());

    let status = bootstrap.run().await;
    assert_eq!(status.phase, SessionPhase::Unreachable);
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A1", "R1")));
}

#[tokio::test]
async fn test_bootstrap_stays_loading_until_settled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "u-3", "role": "advisor"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let bootstrap = Arc::new(SessionBootstrap::new(client));
    let status_rx = bootstrap.status();

    let running = {
        let bootstrap = bootstrap.clone();
        tokio::spawn(async move { bootstrap.run().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!running.is_finished());
    assert!(status_rx.borrow().loading);
    assert_eq!(status_rx.borrow().phase, SessionPhase::Anonymous);

    let status = running.await.unwrap();
    assert!(!status.loading);
    assert!(status.is_authenticated());
    assert!(!status_rx.borrow().loading);
}

#[tokio::test]
async fn test_bootstrap_recovers_expired_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "u-9", "email": "kid@school.test", "role": "student"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2", "refresh_token": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Some(TokenPair::new("A1", "R1")));
    let bootstrap = SessionBootstrap::new(client.clone());

    let status = bootstrap.run().await;
    assert!(!status.loading);
    assert_eq!(status.user().unwrap().id, "u-9");
    assert!(matches!(status.phase, SessionPhase::Authenticated(_)));
    assert_eq!(client.store().tokens(), Some(TokenPair::new("A2", "R2")));
}
