//! Load Balancer
//!
//! Registry of sibling backend instances with round-robin and least-loaded
//! selection. Health flags are flipped by the health monitor; connection
//! counters by the session affinity service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::entities::{ServerInstance, ServerInstanceInfo};
use crate::infrastructure::metrics;

/// Pool-wide statistics.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub total_servers: usize,
    pub healthy_servers: usize,
    pub servers: Vec<ServerInstanceInfo>,
}

/// Server pool with round-robin and least-loaded selection.
pub struct LoadBalancer {
    servers: DashMap<String, Arc<ServerInstance>>,
    /// Registration order, drives the round-robin cursor
    server_order: RwLock<Vec<String>>,
    cursor: AtomicUsize,
}

impl LoadBalancer {
    pub fn new() -> Self {
        Self {
            servers: DashMap::new(),
            server_order: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Register an instance. Re-registering an id replaces the instance but
    /// keeps its position in the round-robin order.
    pub fn register_server(&self, server_id: &str, url: &str) {
        let instance = Arc::new(ServerInstance::new(server_id, url));
        self.servers.insert(server_id.to_string(), instance);

        let mut order = self.server_order.write();
        if !order.iter().any(|id| id == server_id) {
            order.push(server_id.to_string());
        }
        drop(order);

        metrics::set_healthy_servers(self.healthy_count());
        tracing::info!(server_id = %server_id, url = %url, "Registered server");
    }

    pub fn unregister_server(&self, server_id: &str) {
        self.servers.remove(server_id);
        self.server_order.write().retain(|id| id != server_id);
        metrics::set_healthy_servers(self.healthy_count());
        tracing::info!(server_id = %server_id, "Unregistered server");
    }

    pub fn get_server(&self, server_id: &str) -> Option<Arc<ServerInstance>> {
        self.servers.get(server_id).map(|entry| entry.clone())
    }

    /// Round-robin selection over the registration order. `None` when the
    /// pool is empty.
    pub fn next_server(&self) -> Option<Arc<ServerInstance>> {
        let order = self.server_order.read();
        if order.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % order.len();
        let server_id = order[index].clone();
        drop(order);
        self.get_server(&server_id)
    }

    /// The healthy instance with the fewest active connections.
    pub fn least_loaded_server(&self) -> Option<Arc<ServerInstance>> {
        self.servers
            .iter()
            .filter(|entry| entry.is_healthy())
            .min_by_key(|entry| entry.active_connections())
            .map(|entry| entry.clone())
    }

    /// Flip an instance's advertised health and stamp the check time.
    pub fn update_health(&self, server_id: &str, healthy: bool) {
        if let Some(instance) = self.servers.get(server_id) {
            instance.set_healthy(healthy);
            instance.touch_health_check();
            metrics::set_healthy_servers(self.healthy_count());
        }
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn healthy_count(&self) -> usize {
        self.servers.iter().filter(|entry| entry.is_healthy()).count()
    }

    pub fn stats(&self) -> PoolStats {
        let servers: Vec<ServerInstanceInfo> =
            self.servers.iter().map(|entry| entry.snapshot()).collect();
        PoolStats {
            total_servers: servers.len(),
            healthy_servers: servers.iter().filter(|s| s.healthy).count(),
            servers,
        }
    }

    /// Snapshot of every instance, for the health probe loop.
    pub fn all_servers(&self) -> Vec<Arc<ServerInstance>> {
        self.servers.iter().map(|entry| entry.clone()).collect()
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}
