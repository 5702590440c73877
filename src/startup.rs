//! Application Startup
//!
//! Wires the routing core together and runs the server. Every component is
//! constructed here and handed to its consumers explicitly; nothing is a
//! process-wide singleton, so tests can build isolated instances of the
//! whole stack.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::events::default_event_configs;
use crate::application::services::{
    ConnectionRegistry, DispatchContext, EventDispatchTable, MessageRouter,
};
use crate::config::{CorsSettings, Settings};
use crate::infrastructure::pool::{HealthMonitor, LoadBalancer, SessionAffinity};
use crate::presentation::http::routes;
use crate::presentation::websocket::{FrameAssembler, Gateway};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub gateway: Arc<Gateway>,
    pub assembler: Arc<FrameAssembler>,
    pub dispatch: Arc<EventDispatchTable>,
    pub dispatch_ctx: Arc<DispatchContext>,
    pub router: Arc<MessageRouter>,
    pub pool: Arc<LoadBalancer>,
    pub affinity: Arc<SessionAffinity>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Construct the full component graph from settings.
    pub fn build(settings: Settings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let gateway = Arc::new(Gateway::new());
        let assembler = Arc::new(FrameAssembler::new());

        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            gateway.clone(),
            gateway.clone(),
            gateway.clone(),
        ));

        let dispatch = Arc::new(EventDispatchTable::new());
        dispatch.register_all(default_event_configs());

        let dispatch_ctx = Arc::new(DispatchContext {
            registry: registry.clone(),
            publisher: gateway.clone(),
            router: router.clone(),
            user_index: gateway.clone(),
            groups: gateway.clone(),
        });

        let pool = Arc::new(LoadBalancer::new());
        let instances = settings.pool.parsed_instances();
        if instances.is_empty() {
            // Single-instance deployment: the pool still tracks ourselves
            pool.register_server(
                &settings.server.server_id,
                &format!("{}:{}", settings.pool.default_url, settings.server.port),
            );
        } else {
            for (server_id, url) in instances {
                pool.register_server(&server_id, &url);
            }
        }
        let affinity = Arc::new(SessionAffinity::new(pool.clone()));

        Self {
            settings: Arc::new(settings),
            registry,
            gateway,
            assembler,
            dispatch,
            dispatch_ctx,
            router,
            pool,
            affinity,
            started_at: Utc::now(),
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let state = AppState::build(settings);

        spawn_health_monitor(&state);
        spawn_eviction_sweep(&state);

        // Build router with middleware
        let router = routes::create_router(state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&state.settings.cors));

        let addr: SocketAddr = state.settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// CORS policy for the HTTP surface. An empty origin list leaves the
/// surface open, the single-host development setup.
fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<_> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn spawn_health_monitor(state: &AppState) {
    let monitor = Arc::new(HealthMonitor::new(state.pool.clone(), &state.settings.pool));
    tokio::spawn(monitor.run());
}

/// Periodically evicts connection records that are disconnected and older
/// than the retention window. Live sessions are never touched.
fn spawn_eviction_sweep(state: &AppState) {
    let registry = state.registry.clone();
    let retention = chrono::Duration::seconds(state.settings.presence.retention_secs as i64);
    let period = Duration::from_secs(state.settings.presence.sweep_interval_secs);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // skip the immediate first tick
        loop {
            interval.tick().await;
            let evicted = registry.evict_stale(retention);
            if evicted > 0 {
                tracing::info!(evicted, "Evicted stale connection records");
            }
        }
    });
}
