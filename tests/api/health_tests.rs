//! Health and metrics endpoint tests.

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::{body_string, TestApp};

#[tokio::test]
async fn health_returns_the_literal_ok_body() {
    let app = TestApp::new();
    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    // Sibling instances compare the body byte-for-byte
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn readiness_reports_uptime_and_counts() {
    let app = TestApp::new();
    app.state.registry.track("s1", "127.0.0.1", "test-agent");

    let response = app.get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["active_connections"], 1);
    assert_eq!(body["tracked_connections"], 1);
    assert_eq!(body["total_servers"], 1);
    assert!(body["uptime_seconds"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn metrics_exports_prometheus_text() {
    let app = TestApp::new();
    app.state.registry.track("s1", "127.0.0.1", "test-agent");

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("chat_relay_active_connections"));
    assert!(body.contains("chat_relay_pool_healthy_servers"));
}
