//! Connection Registry
//!
//! Process-wide presence table: session id → connection record. Tracks
//! connects and disconnects, notifies registered observers, and owns the
//! stale-record eviction policy.
//!
//! Disconnecting never removes a record; it only flips `is_connected` and
//! stamps `disconnected_at`. Removal happens solely through
//! [`ConnectionRegistry::evict_stale`], which targets records that are both
//! disconnected and older than the retention window.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::entities::ConnectionRecord;
use crate::infrastructure::metrics;

/// Observer invoked on connect/disconnect with the affected record.
pub type ConnectionObserver = Arc<dyn Fn(&ConnectionRecord) + Send + Sync>;

/// In-memory presence table with connect/disconnect observers.
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionRecord>,
    connect_observers: RwLock<Vec<ConnectionObserver>>,
    disconnect_observers: RwLock<Vec<ConnectionObserver>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            connect_observers: RwLock::new(Vec::new()),
            disconnect_observers: RwLock::new(Vec::new()),
        }
    }

    /// Insert a record for a freshly established connection and notify
    /// connect observers.
    pub fn track(&self, session_id: &str, ip_address: &str, user_agent: &str) {
        let record = ConnectionRecord::new(session_id, ip_address, user_agent);

        tracing::info!(
            session_id = %session_id,
            ip = %ip_address,
            user_agent = %user_agent,
            "Connection established"
        );

        self.connections.insert(session_id.to_string(), record.clone());
        metrics::set_active_connections(self.active_count());
        self.notify(&self.connect_observers, &record);
    }

    /// Mark a record disconnected. The record stays in the table; only the
    /// connected flag and disconnect timestamp change. No-op for unknown
    /// sessions.
    pub fn untrack(&self, session_id: &str) {
        let record = match self.connections.get_mut(session_id) {
            Some(mut entry) => {
                entry.is_connected = false;
                entry.disconnected_at = Some(Utc::now());
                entry.clone()
            }
            None => return,
        };

        tracing::info!(
            session_id = %session_id,
            username = %record.username,
            duration_secs = record.connection_duration().num_seconds(),
            "Connection closed"
        );

        metrics::set_active_connections(self.active_count());
        self.notify(&self.disconnect_observers, &record);
    }

    /// In-place username update; no-op if the session is unknown.
    pub fn set_username(&self, session_id: &str, username: &str) {
        if let Some(mut entry) = self.connections.get_mut(session_id) {
            entry.username = username.to_string();
        }
    }

    /// Record a group membership on the session's record (join order kept).
    pub fn join_group(&self, session_id: &str, group_id: &str) {
        if let Some(mut entry) = self.connections.get_mut(session_id) {
            if !entry.groups.iter().any(|g| g == group_id) {
                entry.groups.push(group_id.to_string());
            }
        }
    }

    /// Remove a group membership from the session's record.
    pub fn leave_group(&self, session_id: &str, group_id: &str) {
        if let Some(mut entry) = self.connections.get_mut(session_id) {
            entry.groups.retain(|g| g != group_id);
        }
    }

    pub fn get(&self, session_id: &str) -> Option<ConnectionRecord> {
        self.connections.get(session_id).map(|entry| entry.clone())
    }

    /// Every record, connected or not.
    pub fn all(&self) -> Vec<ConnectionRecord> {
        self.connections.iter().map(|entry| entry.clone()).collect()
    }

    /// Records whose transport is still open.
    pub fn all_active(&self) -> Vec<ConnectionRecord> {
        self.connections
            .iter()
            .filter(|entry| entry.is_connected)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Session ids of all active records. Used as the per-message routing
    /// snapshot.
    pub fn active_session_ids(&self) -> Vec<String> {
        self.connections
            .iter()
            .filter(|entry| entry.is_connected)
            .map(|entry| entry.session_id.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn active_count(&self) -> usize {
        self.connections.iter().filter(|entry| entry.is_connected).count()
    }

    pub fn on_connect(&self, observer: ConnectionObserver) {
        self.connect_observers.write().push(observer);
    }

    pub fn on_disconnect(&self, observer: ConnectionObserver) {
        self.disconnect_observers.write().push(observer);
    }

    /// Remove records that are disconnected and stale beyond `retention`.
    /// Active records are never touched. Returns the number evicted.
    pub fn evict_stale(&self, retention: Duration) -> usize {
        let now = Utc::now();
        // Counted per removal: the table length can grow concurrently while
        // the sweep runs, so a before/after length diff is not reliable.
        let mut evicted = 0;
        self.connections.retain(|_, record| {
            let stale = record.is_stale(retention, now);
            if stale {
                evicted += 1;
            }
            !stale
        });

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted stale connection records");
        }
        evicted
    }

    /// Observers are best-effort: a panic inside one is caught and logged,
    /// never propagated to the caller or to other observers.
    fn notify(&self, observers: &RwLock<Vec<ConnectionObserver>>, record: &ConnectionRecord) {
        let observers = observers.read().clone();
        for observer in observers {
            if let Err(err) = catch_unwind(AssertUnwindSafe(|| observer(record))) {
                let detail = err
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| err.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    session_id = %record.session_id,
                    "Error in connection observer: {}",
                    detail
                );
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry_with(sessions: &[&str]) -> ConnectionRegistry {
        let registry = ConnectionRegistry::new();
        for session in sessions {
            registry.track(session, "127.0.0.1", "test-agent");
        }
        registry
    }

    #[test]
    fn untrack_keeps_the_record() {
        let registry = registry_with(&["s1"]);
        registry.untrack("s1");

        let record = registry.get("s1").expect("record must survive disconnect");
        assert!(!record.is_connected);
        assert!(record.disconnected_at.is_some());
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn username_update_is_in_place() {
        let registry = registry_with(&["s1"]);
        registry.set_username("s1", "alice");
        assert_eq!(registry.get("s1").unwrap().username, "alice");

        // Unknown session is a no-op
        registry.set_username("nope", "bob");
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn group_membership_preserves_join_order() {
        let registry = registry_with(&["s1"]);
        registry.join_group("s1", "group_a");
        registry.join_group("s1", "group_b");
        registry.join_group("s1", "group_a"); // duplicate ignored

        assert_eq!(registry.get("s1").unwrap().groups, vec!["group_a", "group_b"]);

        registry.leave_group("s1", "group_a");
        assert_eq!(registry.get("s1").unwrap().groups, vec!["group_b"]);
    }

    #[test]
    fn observers_fire_on_connect_and_disconnect() {
        let registry = ConnectionRegistry::new();
        let connects = Arc::new(AtomicUsize::new(0));
        let disconnects = Arc::new(AtomicUsize::new(0));

        let c = connects.clone();
        registry.on_connect(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let d = disconnects.clone();
        registry.on_disconnect(Arc::new(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        }));

        registry.track("s1", "127.0.0.1", "test-agent");
        registry.untrack("s1");

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_observer_does_not_poison_others() {
        let registry = ConnectionRegistry::new();
        let reached = Arc::new(AtomicUsize::new(0));

        registry.on_connect(Arc::new(|_| panic!("observer bug")));
        let r = reached.clone();
        registry.on_connect(Arc::new(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        }));

        registry.track("s1", "127.0.0.1", "test-agent");
        assert_eq!(reached.load(Ordering::SeqCst), 1);
        assert!(registry.get("s1").is_some());
    }

    #[test]
    fn eviction_only_removes_stale_disconnected_records() {
        let registry = registry_with(&["live", "gone"]);
        registry.untrack("gone");

        // Backdate the disconnect so it is past the retention window
        if let Some(mut entry) = registry.connections.get_mut("gone") {
            entry.disconnected_at = Some(Utc::now() - Duration::hours(2));
        }

        let evicted = registry.evict_stale(Duration::hours(1));
        assert_eq!(evicted, 1);
        assert!(registry.get("gone").is_none());
        assert!(registry.get("live").is_some());

        // Freshly disconnected records survive
        registry.untrack("live");
        assert_eq!(registry.evict_stale(Duration::hours(1)), 0);
        assert!(registry.get("live").is_some());
    }

    #[test]
    fn eviction_count_stays_exact_while_new_sessions_arrive() {
        let registry = Arc::new(ConnectionRegistry::new());
        for i in 0..50 {
            let session = format!("old_{}", i);
            registry.track(&session, "127.0.0.1", "test-agent");
            registry.untrack(&session);
            if let Some(mut entry) = registry.connections.get_mut(&session) {
                entry.disconnected_at = Some(Utc::now() - Duration::hours(2));
            }
        }

        // Connects racing the sweep must not skew the evicted count
        let tracker = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    registry.track(&format!("new_{}", i), "127.0.0.1", "test-agent");
                }
            })
        };

        let evicted = registry.evict_stale(Duration::hours(1));
        tracker.join().unwrap();

        assert_eq!(evicted, 50);
        assert_eq!(registry.count(), 500);
        assert_eq!(registry.active_count(), 500);
    }
}
