//! Session Affinity
//!
//! Pins each session to the backend instance it was assigned to. The
//! instance's connection counter is only ever moved through the paired
//! assign/remove operations here, so it can never go negative.

use std::sync::Arc;

use dashmap::DashMap;

use crate::infrastructure::pool::load_balancer::LoadBalancer;

/// Session → server pinning over the load balancer's pool.
pub struct SessionAffinity {
    assignments: DashMap<String, String>,
    pool: Arc<LoadBalancer>,
}

impl SessionAffinity {
    pub fn new(pool: Arc<LoadBalancer>) -> Self {
        Self {
            assignments: DashMap::new(),
            pool,
        }
    }

    /// Pin `session_id` to `server_id` and count the connection against that
    /// instance. Re-assigning a pinned session to a different instance moves
    /// the count with it.
    pub fn assign(&self, session_id: &str, server_id: &str) {
        let previous = self
            .assignments
            .insert(session_id.to_string(), server_id.to_string());

        match previous {
            Some(ref old) if old == server_id => return,
            Some(old) => {
                if let Some(instance) = self.pool.get_server(&old) {
                    instance.decrement_connections();
                }
            }
            None => {}
        }

        if let Some(instance) = self.pool.get_server(server_id) {
            instance.increment_connections();
        }
        tracing::debug!(session_id = %session_id, server_id = %server_id, "Session pinned");
    }

    /// Drop the pinning and release the connection count.
    pub fn remove(&self, session_id: &str) {
        if let Some((_, server_id)) = self.assignments.remove(session_id) {
            if let Some(instance) = self.pool.get_server(&server_id) {
                instance.decrement_connections();
            }
            tracing::debug!(session_id = %session_id, server_id = %server_id, "Session unpinned");
        }
    }

    /// The instance this session is pinned to, if any. Stable until
    /// explicitly removed.
    pub fn server_for_session(&self, session_id: &str) -> Option<String> {
        self.assignments.get(session_id).map(|entry| entry.clone())
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}
