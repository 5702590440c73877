//! Common Test Utilities
//!
//! Builds the full component graph with test settings and drives the HTTP
//! surface through `tower::ServiceExt::oneshot`.

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;

use chat_relay::config::{
    CorsSettings, PoolSettings, PresenceSettings, ServerSettings, Settings, WebSocketSettings,
};
use chat_relay::presentation::http::create_router;
use chat_relay::startup::AppState;

/// Settings for an isolated test instance. No config files, no env.
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
            server_id: "test-server".into(),
        },
        presence: PresenceSettings {
            retention_secs: 3600,
            sweep_interval_secs: 300,
        },
        pool: PoolSettings {
            health_check_interval_secs: 30,
            failure_threshold: 3,
            recovery_threshold: 1,
            instances: Vec::new(),
            default_url: "http://localhost".into(),
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
            dispatch_queue_capacity: 64,
        },
        cors: CorsSettings {
            allowed_origins: Vec::new(),
        },
        environment: "test".into(),
    }
}

/// Test application with the real router and an isolated component graph.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::build(test_settings());
        let router = create_router(state.clone());
        Self { state, router }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Collect a response body into a string.
pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
