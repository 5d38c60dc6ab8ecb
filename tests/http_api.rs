//! Local query API served by a running application.

mod common;

use std::time::Duration;

use common::{spawn_app, test_config, wait_for_ok};
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

fn sample_config(dir: &TempDir) -> api_cacher::CacherConfig {
    let mut config = test_config(dir.path(), "https://api.example.com/v1/data");
    config.upstream.test_mode = true;
    config.upstream.api_key = Some("never-shown".to_string());
    config
}

#[tokio::test]
async fn test_data_and_status_after_first_fetch() {
    let dir = TempDir::new().unwrap();
    let app = spawn_app(sample_config(&dir)).await;
    let client = reqwest::Client::new();

    let res = wait_for_ok(&client, &app.url("/data")).await;
    assert_eq!(res.headers()["x-cache-copy"], "live");
    let data: Value = res.json().await.unwrap();
    assert_eq!(data["items"].as_array().unwrap().len(), 10);

    let connection: Value = client.get(app.url("/status/connection")).send().await.unwrap().json().await.unwrap();
    assert_eq!(connection["connection_status"], "connected");
    assert_eq!(connection["consecutive_failures"], 0);
    assert!(connection["last_successful_fetch"].is_string());

    let status: Value = client.get(app.url("/status")).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["stats"]["api_calls_count"], 1);
    assert_eq!(status["rate_limit"]["enabled"], true);
    assert!(status["rate_limit"]["seconds_until_allowed"].as_u64().unwrap() > 0);
    assert!(status["cache"]["backup"].is_object());
    assert!(!status.to_string().contains("never-shown"));

    let backup: Value = client.get(app.url("/backup")).send().await.unwrap().json().await.unwrap();
    assert_eq!(backup["payload"], data);
    assert_eq!(backup["source"], "TEST_MODE");

    app.stop().await;
}

#[tokio::test]
async fn test_empty_cache_returns_404() {
    let dir = TempDir::new().unwrap();
    let app = spawn_app(test_config(dir.path(), "http://127.0.0.1:1/unreachable")).await;
    let client = reqwest::Client::new();

    let res = client.get(app.url("/data")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"error": "No data available"}));

    let res = client.get(app.url("/backup")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"error": "No backup available"}));

    app.stop().await;
}

#[tokio::test]
async fn test_root_redirects_and_request_id_is_set() {
    let dir = TempDir::new().unwrap();
    let app = spawn_app(sample_config(&dir)).await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let res = client.get(app.url("/")).send().await.unwrap();
    assert!(res.status().is_redirection());
    assert_eq!(res.headers()["location"], "/status");
    assert!(res.headers().contains_key("x-request-id"));

    let res = client
        .get(app.url("/status"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    app.stop().await;
}

#[tokio::test]
async fn test_config_read_and_update() {
    let dir = TempDir::new().unwrap();
    let app = spawn_app(sample_config(&dir)).await;
    let client = reqwest::Client::new();

    let config: Value = client.get(app.url("/config")).send().await.unwrap().json().await.unwrap();
    assert_eq!(config["fetch_interval_seconds"], 300);
    assert!(config.get("api_key").is_none());
    assert!(config.get("endpoint_url").is_none());

    let res = client.post(app.url("/config")).json(&json!({"fetch_interval_seconds": 5})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(app.url("/config"))
        .json(&json!({"endpoint_url": "https://evil.example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.post(app.url("/config")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(app.url("/config"))
        .json(&json!({"fetch_interval_seconds": 60, "api_description": "Weather"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["config"]["fetch_interval_seconds"], 60);

    let config: Value = client.get(app.url("/config")).send().await.unwrap().json().await.unwrap();
    assert_eq!(config["fetch_interval_seconds"], 60);
    assert_eq!(config["api_description"], "Weather");

    app.stop().await;
}

#[tokio::test]
async fn test_event_stream_starts_with_snapshot_and_ends_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let app = spawn_app(sample_config(&dir)).await;
    let client = reqwest::Client::new();

    let res = client.get(app.url("/events")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/event-stream");

    let mut stream = res.bytes_stream();
    let mut received = String::new();
    while !received.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(received.starts_with("event: connection_status\n"));

    // An open stream must not hold up graceful shutdown.
    app.stop().await;
}

#[tokio::test]
async fn test_oversized_interval_rejected_and_scheduler_survives() {
    let dir = TempDir::new().unwrap();
    let app = spawn_app(sample_config(&dir)).await;
    let client = reqwest::Client::new();
    wait_for_ok(&client, &app.url("/data")).await;

    let res = client
        .post(app.url("/config"))
        .json(&json!({"fetch_interval_seconds": u64::MAX}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("at most"));

    let config: Value = client.get(app.url("/config")).send().await.unwrap().json().await.unwrap();
    assert_eq!(config["fetch_interval_seconds"], 300);

    // The scheduler still owns its channel, so a valid update is accepted.
    let res = client
        .post(app.url("/config"))
        .json(&json!({"fetch_interval_seconds": 10}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!app.handle.is_finished());

    app.stop().await;
}
