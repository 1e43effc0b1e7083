//! Cookie persistence over real HTTP: Set-Cookie capture, replay and restart.

use std::sync::Arc;

use art_catalog_core::{
    CatalogApp, ClientConfig, KeyValueStore, MemoryKeyValueStore, SessionStatus, SystemClock,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: format!("{}/api", server.uri()),
        cookie_path: None,
        master_key: None,
        ..ClientConfig::default()
    }
}

fn profile_body() -> serde_json::Value {
    json!({
        "id": "u1",
        "fullName": "Ada Lovelace",
        "email": "ada@example.com",
        "profileImageUrl": "https://img.example.com/ada.png"
    })
}

async fn mount_auth_endpoints(server: &MockServer, set_cookie: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", set_cookie))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("cookie", "token=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_cookie_is_replayed_on_next_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_auth_endpoints(&server, "token=abc123; Path=/; HttpOnly").await;
    let backend = Arc::new(MemoryKeyValueStore::new());
    let app = CatalogApp::with_backend(config_for(&server), backend.clone(), Arc::new(SystemClock))
        .unwrap();

    app.session().login("ada@example.com", "pw").await.unwrap();

    let session = app.session().snapshot();
    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.full_name(), Some("Ada Lovelace"));
    assert_eq!(backend.len(), 1);
    assert_eq!(backend.entries().unwrap()[0].0, "127.0.0.1_token");
}

#[tokio::test]
async fn test_session_survives_restart_with_encrypted_file_store() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_auth_endpoints(&server, "token=abc123; Path=/; Max-Age=3600").await;
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = dir.path().join("cookies.json");
    let config = ClientConfig {
        cookie_path: Some(cookie_path.clone()),
        master_key: Some("correct horse battery staple".to_string()),
        ..config_for(&server)
    };

    {
        let app = CatalogApp::new(config.clone()).unwrap();
        app.session().login("ada@example.com", "pw").await.unwrap();
    }

    let on_disk = std::fs::read(&cookie_path).unwrap();
    assert!(
        !String::from_utf8_lossy(&on_disk).contains("abc123"),
        "cookie value must not be stored in clear text"
    );

    let restarted = CatalogApp::new(config).unwrap();
    assert!(restarted.session().check_auth_status().await);
    assert_eq!(
        restarted.session().snapshot().full_name(),
        Some("Ada Lovelace")
    );
}

#[tokio::test]
async fn test_wrong_master_key_starts_signed_out() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_auth_endpoints(&server, "token=abc123; Path=/").await;
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        cookie_path: Some(dir.path().join("cookies.json")),
        master_key: Some("first key".to_string()),
        ..config_for(&server)
    };
    {
        let app = CatalogApp::new(config.clone()).unwrap();
        app.session().login("ada@example.com", "pw").await.unwrap();
    }

    let rekeyed = CatalogApp::new(ClientConfig {
        master_key: Some("second key".to_string()),
        ..config
    })
    .unwrap();

    assert!(!rekeyed.session().check_auth_status().await);
}

#[tokio::test]
async fn test_server_expired_cookie_is_not_replayed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_auth_endpoints(&server, "token=abc123; Path=/; Max-Age=0").await;
    let app = CatalogApp::with_backend(
        config_for(&server),
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(SystemClock),
    )
    .unwrap();

    app.session().login("ada@example.com", "pw").await.unwrap();

    assert!(!app.session().check_auth_status().await);
    assert!(app.cookies().load("127.0.0.1").is_empty());
}

#[tokio::test]
async fn test_sign_out_with_forget_erases_cookies() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_auth_endpoints(&server, "token=abc123; Path=/").await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let app = CatalogApp::with_backend(
        config_for(&server),
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(SystemClock),
    )
    .unwrap();
    app.session().login("ada@example.com", "pw").await.unwrap();

    app.sign_out(true).await;

    assert!(!app.session().snapshot().is_authenticated());
    assert!(app.cookies().load("127.0.0.1").is_empty());
    assert!(!app.session().check_auth_status().await);
}
