//! Route Configuration

use axum::{routing::get, Router};

use super::handlers;
use crate::presentation::websocket::handler::ws_handler;
use crate::startup::AppState;

/// Create the main router: the WebSocket endpoint plus the operational HTTP
/// surface.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/ws", get(ws_handler))
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/connections", get(handlers::list_connections))
        .route("/events", get(handlers::list_events))
        .route("/pool", get(handlers::pool_stats))
}
