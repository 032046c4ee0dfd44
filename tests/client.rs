//! ApiClient against a live server on an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use bitbets::client::{ApiClient, ClientError};
use bitbets::config::Settings;
use bitbets::models::{Collection, JsonMap};
use bitbets::rate_limit::{RouteKey, RouteLimit};
use bitbets::server::{create_router, AppState};
use serde_json::json;
use tempfile::tempdir;
use tokio::net::TcpListener;

async fn spawn_server(settings: Settings) -> String {
    let state = AppState::new(&settings);
    state.store.init().await.unwrap();
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn health_and_merge_round_trip() {
    let dir = tempdir().unwrap();
    let url = spawn_server(Settings::with_data_dir(dir.path())).await;
    let client = ApiClient::new(&url).unwrap();

    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "healthy");

    let mut users = JsonMap::new();
    users.insert("alice".into(), json!("pw"));
    let reply = client.merge_collection(Collection::Users, &users).await.unwrap();
    assert_eq!(reply.status, "success");
    assert_eq!(reply.message, "Users updated");

    let fetched = client.get_collection(Collection::Users).await.unwrap();
    assert_eq!(fetched, users);

    let stats = client.stats().await.unwrap();
    assert_eq!(stats["total_users"], 1);

    let reply = client.trigger_backup().await.unwrap();
    assert_eq!(reply.message, "Backup creation started");
}

#[tokio::test]
async fn leaderboard_reflects_recorded_results() {
    let dir = tempdir().unwrap();
    let url = spawn_server(Settings::with_data_dir(dir.path())).await;
    let client = ApiClient::new(&url).unwrap();

    let mut guesses = JsonMap::new();
    guesses.insert("alice".into(), json!({"cs-f111": {"midsem": 74.5}}));
    guesses.insert("bob".into(), json!({"cs-f111": {"midsem": 60}}));
    client
        .merge_collection(Collection::Guesses, &guesses)
        .await
        .unwrap();

    let empty = client.leaderboard().await.unwrap();
    assert_eq!(empty, json!([]));

    let mut results = JsonMap::new();
    results.insert("cs-f111".into(), json!({"midsem": 75}));
    client
        .merge_collection(Collection::Results, &results)
        .await
        .unwrap();

    let board = client.leaderboard().await.unwrap();
    assert_eq!(board.as_array().unwrap().len(), 1);
    assert_eq!(board[0]["course"], "cs-f111");
    assert_eq!(board[0]["winners"], json!(["alice"]));
}

#[tokio::test]
async fn validation_errors_are_not_retried() {
    let dir = tempdir().unwrap();
    let url = spawn_server(Settings::with_data_dir(dir.path())).await;
    let client = ApiClient::new(&url).unwrap().with_retries(3, 10);

    let mut results = JsonMap::new();
    results.insert("cs-f111".into(), json!({"midsem": 500}));
    let err = client
        .merge_collection(Collection::Results, &results)
        .await
        .unwrap_err();

    match err {
        ClientError::Http { status, .. } => assert_eq!(status, 400),
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn rate_limited_request_reports_429() {
    let dir = tempdir().unwrap();
    let mut settings = Settings::with_data_dir(dir.path());
    settings
        .rate_limits
        .insert(RouteKey::Stats, RouteLimit::new(1, 60));
    let url = spawn_server(settings).await;
    let client = ApiClient::new(&url).unwrap().with_retries(1, 10);

    client.stats().await.unwrap();
    let err = client.stats().await.unwrap_err();

    assert!(matches!(err, ClientError::Http { status: 429, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{}", addr))
        .unwrap()
        .with_retries(2, 10);
    let err = client.health().await.unwrap_err();

    assert!(matches!(err, ClientError::Connection { .. }), "{:?}", err);
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = ApiClient::with_timeout(format!("http://{}", addr), Duration::from_millis(200))
        .unwrap()
        .with_retries(1, 0);
    let err = client.health().await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout { .. }), "{:?}", err);
}
