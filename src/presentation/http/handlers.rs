//! Operational HTTP Handlers
//!
//! The plain `/health` endpoint returns the literal body `OK` because
//! sibling instances probe each other with an exact body comparison.
//! Everything else is a JSON view over the live in-memory state.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;

use crate::domain::entities::ConnectionRecord;
use crate::infrastructure::pool::PoolStats;
use crate::startup::AppState;

/// `GET /health`: exact body the pool's health prober expects.
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub uptime_seconds: i64,
    pub active_connections: usize,
    pub tracked_connections: usize,
    pub healthy_servers: usize,
    pub total_servers: usize,
}

/// `GET /health/ready`
pub async fn readiness(State(state): State<AppState>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        active_connections: state.registry.active_count(),
        tracked_connections: state.registry.count(),
        healthy_servers: state.pool.healthy_count(),
        total_servers: state.pool.server_count(),
    })
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub total: usize,
    pub active: usize,
    pub connections: Vec<ConnectionRecord>,
}

/// `GET /api/v1/connections`
pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    let connections = state.registry.all();
    Json(ConnectionsResponse {
        total: connections.len(),
        active: connections.iter().filter(|c| c.is_connected).count(),
        connections,
    })
}

#[derive(Debug, Serialize)]
pub struct EventInfo {
    pub event_name: String,
    pub broadcast: bool,
    pub destination: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventInfo>,
}

/// `GET /api/v1/events`
pub async fn list_events(State(state): State<AppState>) -> Json<EventsResponse> {
    let mut events: Vec<EventInfo> = state
        .dispatch
        .list_all()
        .into_iter()
        .map(|config| EventInfo {
            event_name: config.event_name,
            broadcast: config.broadcast,
            destination: config.destination,
        })
        .collect();
    events.sort_by(|a, b| a.event_name.cmp(&b.event_name));
    Json(EventsResponse { events })
}

/// `GET /api/v1/pool`
pub async fn pool_stats(State(state): State<AppState>) -> Json<PoolStats> {
    Json(state.pool.stats())
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::infrastructure::metrics::gather_metrics(),
    )
}
