//! Tests for the `/api/v1` introspection endpoints.

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::{body_string, TestApp};

#[tokio::test]
async fn connections_endpoint_reflects_the_registry() {
    let app = TestApp::new();
    app.state.registry.track("s1", "127.0.0.1", "agent-1");
    app.state.registry.track("s2", "127.0.0.2", "agent-2");
    app.state.registry.untrack("s2");

    let response = app.get("/api/v1/connections").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["active"], 1);
    // Disconnected records stay visible
    let sessions: Vec<&str> = body["connections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["session_id"].as_str().unwrap())
        .collect();
    assert!(sessions.contains(&"s1"));
    assert!(sessions.contains(&"s2"));
}

#[tokio::test]
async fn events_endpoint_lists_the_default_event_set() {
    let app = TestApp::new();

    let response = app.get("/api/v1/events").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let names: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["chat", "direct", "join-group", "leave-group", "ping", "set-username", "typing"]
    );
}

#[tokio::test]
async fn pool_endpoint_reports_the_registered_instances() {
    let app = TestApp::new();

    let response = app.get("/api/v1/pool").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["total_servers"], 1);
    assert_eq!(body["healthy_servers"], 1);
    assert_eq!(body["servers"][0]["server_id"], "test-server");
}
