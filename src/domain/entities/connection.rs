//! Connection record entity.
//!
//! One record per physical transport connection. Records are created on
//! connect and are never destroyed by disconnect: disconnection only flips
//! `is_connected` and stamps `disconnected_at`. A reconnecting client gets a
//! fresh session id and a fresh record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Presence metadata for one transport session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Session id, stable for the life of one transport connection
    pub session_id: String,

    /// Display name; mutable after connect
    pub username: String,

    /// Client IP address at connect time
    pub ip_address: String,

    /// Raw user agent string
    pub user_agent: String,

    /// When the connection was established
    pub connected_at: DateTime<Utc>,

    /// When the connection closed (None while connected)
    pub disconnected_at: Option<DateTime<Utc>>,

    /// Whether the transport is still open
    pub is_connected: bool,

    /// Group/chat ids this session has joined, in join order
    pub groups: Vec<String>,
}

impl ConnectionRecord {
    /// Create a record for a freshly established connection.
    pub fn new(session_id: impl Into<String>, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            username: "Anonymous".to_string(),
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
            connected_at: Utc::now(),
            disconnected_at: None,
            is_connected: true,
            groups: Vec::new(),
        }
    }

    /// How long the session has been (or was) connected.
    pub fn connection_duration(&self) -> Duration {
        let end = self.disconnected_at.unwrap_or_else(Utc::now);
        end - self.connected_at
    }

    /// Whether the record is disconnected and older than the retention window.
    pub fn is_stale(&self, retention: Duration, now: DateTime<Utc>) -> bool {
        match self.disconnected_at {
            Some(at) if !self.is_connected => now - at > retention,
            _ => false,
        }
    }
}
