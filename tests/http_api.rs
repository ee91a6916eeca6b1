//! Request bodies the handlers cannot decode still get the JSON error shape the page reads.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde_json::{json, Value};
use target_attention::data::{Dataset, Observation};
use target_attention::server::router;
use target_attention::state::{AppState, Config};

async fn spawn_server() -> SocketAddr {
    let rows = vec![Observation {
        target_name: "EGFR".into(),
        entity_id: "CHEMBL203".into(),
        year: 2010,
        cumulative_value: 40.0,
        best_phase: 4.0,
        peak_to_current_ratio: 0.5,
        relative_difference: 0.3,
    }];
    let config = Config {
        data_path: PathBuf::from("<memory>"),
        bind_addr: "127.0.0.1".into(),
        port: 0,
    };
    let state = AppState::new(config, Dataset::from_rows(rows));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn cleared_range_bound_returns_json_error() {
    let addr = spawn_server().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/overview", addr))
        .json(&json!({ "range": [null, 1.0], "categories": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("range"));
}

#[tokio::test]
async fn widget_body_without_click_returns_json_error() {
    let addr = spawn_server().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/widget/former", addr))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn valid_overview_request_returns_figure() {
    let addr = spawn_server().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/overview", addr))
        .json(&json!({ "range": [0.0, 1.0], "categories": [null, "EGFR"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["line"]["width"], 2.5);
}
