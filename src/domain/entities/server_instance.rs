//! Server instance entity for the backend pool.
//!
//! Connection counters and the health flag are interior-mutable so the
//! load balancer, affinity service, and health monitor can update them
//! concurrently without locking the whole pool.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use chrono::Utc;
use serde::Serialize;

/// One sibling backend process in the pool.
#[derive(Debug)]
pub struct ServerInstance {
    /// Unique server id within the pool
    pub server_id: String,

    /// Base URL the instance serves on (health endpoint lives at `{url}/health`)
    pub url: String,

    active_connections: AtomicUsize,
    healthy: AtomicBool,
    last_health_check: AtomicI64,
}

/// Point-in-time snapshot of an instance, for stats and serialization.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInstanceInfo {
    pub server_id: String,
    pub url: String,
    pub active_connections: usize,
    pub healthy: bool,
    pub last_health_check: i64,
}

impl ServerInstance {
    pub fn new(server_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            url: url.into(),
            active_connections: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
            last_health_check: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn increment_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the connection counter. Saturates at zero: the counter is
    /// only ever moved through paired assign/remove calls and must never go
    /// negative.
    pub fn decrement_connections(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn touch_health_check(&self) {
        self.last_health_check
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerInstanceInfo {
        ServerInstanceInfo {
            server_id: self.server_id.clone(),
            url: self.url.clone(),
            active_connections: self.active_connections(),
            healthy: self.is_healthy(),
            last_health_check: self.last_health_check.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_saturates_at_zero() {
        let instance = ServerInstance::new("s1", "http://localhost:8081");
        instance.decrement_connections();
        assert_eq!(instance.active_connections(), 0);

        instance.increment_connections();
        instance.increment_connections();
        instance.decrement_connections();
        assert_eq!(instance.active_connections(), 1);
    }

    #[test]
    fn new_instance_starts_healthy() {
        let instance = ServerInstance::new("s1", "http://localhost:8081");
        assert!(instance.is_healthy());
        instance.set_healthy(false);
        assert!(!instance.is_healthy());
    }
}
