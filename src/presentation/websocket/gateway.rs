//! WebSocket Gateway
//!
//! Owns the per-session outbound channels plus the user↔session and group
//! membership indexes. It is the delivery fabric behind the routing core's
//! ports: the router and dispatcher address queues, the gateway turns an
//! address into a send on the right session's channel.

use std::collections::HashSet;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::envelope::OutboundFrame;
use crate::domain::ports::{EventPublisher, GroupDirectory, UserSessionIndex};
use crate::shared::error::AppError;

/// Connection fabric for all live WebSocket sessions.
pub struct Gateway {
    /// Outbound channel per live session
    sessions: DashMap<String, mpsc::UnboundedSender<OutboundFrame>>,
    /// User id → session id (one live session per user)
    user_to_session: DashMap<String, String>,
    session_to_user: DashMap<String, String>,
    /// Group id → member session ids
    groups: DashMap<String, HashSet<String>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            user_to_session: DashMap::new(),
            session_to_user: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Register a live session's outbound channel.
    pub fn register(&self, session_id: &str, sender: mpsc::UnboundedSender<OutboundFrame>) {
        self.sessions.insert(session_id.to_string(), sender);
        tracing::debug!(session_id = %session_id, "Session channel registered");
    }

    /// Drop the session's channel, its user binding, and its group
    /// memberships.
    pub fn unregister(&self, session_id: &str) {
        self.sessions.remove(session_id);
        if let Some((_, user_id)) = self.session_to_user.remove(session_id) {
            self.user_to_session.remove(&user_id);
        }
        for mut entry in self.groups.iter_mut() {
            entry.value_mut().remove(session_id);
        }
        tracing::debug!(session_id = %session_id, "Session channel unregistered");
    }

    /// Bind a user id to a session. Rebinding a user replaces the previous
    /// session binding.
    pub fn bind_user(&self, user_id: &str, session_id: &str) {
        if let Some(previous) = self
            .user_to_session
            .insert(user_id.to_string(), session_id.to_string())
        {
            self.session_to_user.remove(&previous);
        }
        self.session_to_user
            .insert(session_id.to_string(), user_id.to_string());
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for Gateway {
    fn publish(
        &self,
        session_id: &str,
        queue: &str,
        event: &str,
        data: Value,
    ) -> Result<(), AppError> {
        let sender = self.sessions.get(session_id).ok_or_else(|| AppError::Delivery {
            session_id: session_id.to_string(),
            reason: "no live channel for session".to_string(),
        })?;

        sender
            .send(OutboundFrame::new(queue, event, data))
            .map_err(|_| AppError::Delivery {
                session_id: session_id.to_string(),
                reason: "session channel closed".to_string(),
            })
    }
}

impl UserSessionIndex for Gateway {
    fn session_by_user_id(&self, user_id: &str) -> Option<String> {
        self.user_to_session.get(user_id).map(|entry| entry.clone())
    }

    fn user_id_by_session(&self, session_id: &str) -> Option<String> {
        self.session_to_user.get(session_id).map(|entry| entry.clone())
    }
}

impl GroupDirectory for Gateway {
    fn group_sessions(&self, group_id: &str) -> HashSet<String> {
        self.groups
            .get(group_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    fn join(&self, group_id: &str, session_id: &str) {
        self.groups
            .entry(group_id.to_string())
            .or_default()
            .insert(session_id.to_string());
    }

    fn leave(&self, group_id: &str, session_id: &str) {
        if let Some(mut members) = self.groups.get_mut(group_id) {
            members.remove(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_delivers_an_envelope_on_the_session_channel() {
        let gateway = Gateway::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        gateway.register("abc", tx);

        gateway
            .publish("abc", "/queue/messages", "chat", json!({"message": "hi"}))
            .unwrap();

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.queue, "/queue/messages");
        assert_eq!(frame.event, "chat");
        assert_eq!(frame.data, json!({"message": "hi"}));
        assert!(frame.timestamp > 0);
    }

    #[test]
    fn publish_to_unknown_session_is_a_delivery_error() {
        let gateway = Gateway::new();
        let result = gateway.publish("ghost", "/queue/messages", "chat", json!({}));
        assert!(matches!(result, Err(AppError::Delivery { .. })));
    }

    #[test]
    fn publish_after_receiver_drop_is_a_delivery_error() {
        let gateway = Gateway::new();
        let (tx, rx) = mpsc::unbounded_channel();
        gateway.register("abc", tx);
        drop(rx);

        let result = gateway.publish("abc", "/queue/messages", "chat", json!({}));
        assert!(matches!(result, Err(AppError::Delivery { .. })));
    }

    #[test]
    fn user_binding_is_bidirectional_and_replaced_on_rebind() {
        let gateway = Gateway::new();
        gateway.bind_user("u1", "s1");

        assert_eq!(gateway.session_by_user_id("u1").as_deref(), Some("s1"));
        assert_eq!(gateway.user_id_by_session("s1").as_deref(), Some("u1"));

        // u1 reconnects on a new session
        gateway.bind_user("u1", "s2");
        assert_eq!(gateway.session_by_user_id("u1").as_deref(), Some("s2"));
        assert!(gateway.user_id_by_session("s1").is_none());
    }

    #[test]
    fn unregister_clears_bindings_and_memberships() {
        let gateway = Gateway::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        gateway.register("s1", tx);
        gateway.bind_user("u1", "s1");
        gateway.join("group_1", "s1");

        gateway.unregister("s1");

        assert_eq!(gateway.session_count(), 0);
        assert!(gateway.session_by_user_id("u1").is_none());
        assert!(gateway.group_sessions("group_1").is_empty());
    }

    #[test]
    fn group_membership_tracks_joins_and_leaves() {
        let gateway = Gateway::new();
        gateway.join("group_1", "s1");
        gateway.join("group_1", "s2");
        gateway.leave("group_1", "s1");

        let members = gateway.group_sessions("group_1");
        assert_eq!(members, HashSet::from(["s2".to_string()]));
        assert!(gateway.group_sessions("group_2").is_empty());
    }
}
