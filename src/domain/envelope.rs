//! Event envelopes crossing the transport boundary.
//!
//! Inbound frames are `{event, data}` documents; outbound frames carry the
//! resolved queue plus `{event, data, timestamp}`. Payloads for known events
//! are validated into [`EventPayload`] at the dispatch boundary so handlers
//! never have to poke at untyped maps.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::error::AppError;

/// Inbound event frame as sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Outbound delivery frame: the `{event, data, timestamp}` envelope plus the
/// queue it is addressed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub queue: String,
    pub event: String,
    pub data: Value,
    pub timestamp: i64,
}

impl OutboundFrame {
    pub fn new(queue: impl Into<String>, event: impl Into<String>, data: Value) -> Self {
        Self {
            queue: queue.into(),
            event: event.into(),
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Payload for a chat message; `chat_id` selects group routing when it
/// carries the reserved `group_` prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// Payload for a direct message to a specific user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectPayload {
    pub to_user_id: String,
    pub message: String,
}

/// Payload updating the sender's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernamePayload {
    pub username: String,
}

/// Payload joining or leaving a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPayload {
    pub group_id: String,
}

/// Payload for a typing indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// Typed event payloads, keyed by event name.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Chat(ChatPayload),
    Direct(DirectPayload),
    SetUsername(UsernamePayload),
    JoinGroup(GroupPayload),
    LeaveGroup(GroupPayload),
    Typing(TypingPayload),
    Ping,
}

impl EventPayload {
    /// Validate raw frame data against the schema for `event`.
    ///
    /// Returns `AppError::Validation` when the event name is known but the
    /// data does not match its schema, and when the event name has no schema
    /// at all (the dispatch table only parses payloads for registered events,
    /// so the latter indicates a registration without a schema).
    pub fn parse(event: &str, data: Value) -> Result<Self, AppError> {
        let invalid = |e: serde_json::Error| {
            AppError::Validation(format!("invalid payload for event '{}': {}", event, e))
        };

        match event {
            "chat" => serde_json::from_value(data).map(Self::Chat).map_err(invalid),
            "direct" => serde_json::from_value(data).map(Self::Direct).map_err(invalid),
            "set-username" => serde_json::from_value(data)
                .map(Self::SetUsername)
                .map_err(invalid),
            "join-group" => serde_json::from_value(data)
                .map(Self::JoinGroup)
                .map_err(invalid),
            "leave-group" => serde_json::from_value(data)
                .map(Self::LeaveGroup)
                .map_err(invalid),
            "typing" => serde_json::from_value(data).map(Self::Typing).map_err(invalid),
            "ping" => Ok(Self::Ping),
            other => Err(AppError::Validation(format!(
                "no payload schema for event '{}'",
                other
            ))),
        }
    }

    /// The event name this payload belongs to.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Direct(_) => "direct",
            Self::SetUsername(_) => "set-username",
            Self::JoinGroup(_) => "join-group",
            Self::LeaveGroup(_) => "leave-group",
            Self::Typing(_) => "typing",
            Self::Ping => "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_chat_payload() {
        let payload = EventPayload::parse("chat", json!({"message": "hi", "chat_id": "group_1"}));
        match payload {
            Ok(EventPayload::Chat(chat)) => {
                assert_eq!(chat.message, "hi");
                assert_eq!(chat.chat_id.as_deref(), Some("group_1"));
            }
            other => panic!("unexpected parse result: {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_payload() {
        let result = EventPayload::parse("direct", json!({"message": "no recipient"}));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn ping_takes_any_data() {
        assert!(matches!(
            EventPayload::parse("ping", json!(null)),
            Ok(EventPayload::Ping)
        ));
    }

    #[test]
    fn outbound_frame_carries_timestamp() {
        let frame = OutboundFrame::new("/topic/broadcast", "chat", json!({"message": "hi"}));
        assert_eq!(frame.queue, "/topic/broadcast");
        assert!(frame.timestamp > 0);
    }
}
