//! Routing directives and the per-message routing context.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

/// Reserved prefix marking a chat id as a group chat.
pub const GROUP_PREFIX: &str = "group_";

/// Queue naming convention layered over the single publish primitive.
pub mod queues {
    /// Echo queue for the sender's own copy of a message.
    pub const SELF: &str = "/user/queue/messages/self";
    /// Queue for copies delivered to every other participant.
    pub const OTHERS: &str = "/user/queue/messages/others";
    /// Default queue when no route set one.
    pub const MESSAGES: &str = "/queue/messages";
    /// Queue used by the SELF route before the per-target split.
    pub const MESSAGES_ALL: &str = "/queue/messages/all";
    /// Shared broadcast topic.
    pub const BROADCAST: &str = "/topic/broadcast";
    /// Direct (user-to-user and explicit-session) queue.
    pub const DIRECT: &str = "/user/queue/messages/direct";
    /// Private error queue for handler failures.
    pub const ERRORS: &str = "/user/queue/errors";

    /// Per-group message queue.
    pub fn group(group_id: &str) -> String {
        format!("/user/queue/messages/group/{}", group_id)
    }
}

/// The fixed set of route types a message can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Originating session only
    ToSelf,
    /// All active sessions except the originator
    Others,
    /// Members of the group carried in the message's `chat_id`
    Group,
    /// All active sessions
    Broadcast,
    /// The explicit `target_session` named in the message
    Session,
    /// The session currently bound to the message's `target_user_id`
    User,
}

impl Route {
    /// Parse a route name as carried in routing directives.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SELF" => Some(Self::ToSelf),
            "OTHERS" => Some(Self::Others),
            "GROUP" => Some(Self::Group),
            "BROADCAST" => Some(Self::Broadcast),
            "SESSION" => Some(Self::Session),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToSelf => "SELF",
            Self::Others => "OTHERS",
            Self::Group => "GROUP",
            Self::Broadcast => "BROADCAST",
            Self::Session => "SESSION",
            Self::User => "USER",
        }
    }
}

/// Ephemeral context for routing one inbound message.
///
/// Constructed fresh per routing call. Carries one consistent snapshot of the
/// active session ids taken when routing began: every resolver works against
/// that snapshot, never against live registry state.
#[derive(Debug)]
pub struct RouteContext {
    /// Originating session
    pub session_id: String,
    /// Raw payload as received
    pub payload: Value,
    /// Normalized message map (`chat_id`, `target_session`, ...)
    pub message: Map<String, Value>,
    /// Target sessions, built incrementally by the resolvers
    pub target_sessions: HashSet<String>,
    /// Routing metadata; at minimum the resolved delivery queue
    pub metadata: HashMap<String, String>,
    /// Active session ids at the moment routing began
    pub active_snapshot: Vec<String>,
}

impl RouteContext {
    pub fn new(
        session_id: impl Into<String>,
        payload: Value,
        message: Map<String, Value>,
        active_snapshot: Vec<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            payload,
            message,
            target_sessions: HashSet::new(),
            metadata: HashMap::new(),
            active_snapshot,
        }
    }

    /// Resolved delivery queue, falling back to the default messages queue.
    pub fn queue(&self) -> &str {
        self.metadata
            .get("queue")
            .map(String::as_str)
            .unwrap_or(queues::MESSAGES)
    }

    /// String field from the message map.
    pub fn message_str(&self, key: &str) -> Option<&str> {
        self.message.get(key).and_then(Value::as_str)
    }
}
