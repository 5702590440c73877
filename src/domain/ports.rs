//! Ports to external collaborators.
//!
//! The routing core does not perform network sends, user account management,
//! or group persistence itself. It consumes these three seams, implemented by
//! the delivery fabric at the edge (and by in-memory fakes in tests).

use std::collections::HashSet;

use serde_json::Value;

use crate::shared::error::AppError;

/// The single underlying publish primitive. All addressing fan-out
/// (self/others/group/broadcast/user/session queues) is a naming convention
/// on top of this.
pub trait EventPublisher: Send + Sync {
    /// Deliver `data` as an `{event, data, timestamp}` envelope addressed to
    /// `queue` on the given session's transport.
    fn publish(
        &self,
        session_id: &str,
        queue: &str,
        event: &str,
        data: Value,
    ) -> Result<(), AppError>;
}

/// User ↔ session binding maintained by the account layer.
pub trait UserSessionIndex: Send + Sync {
    fn session_by_user_id(&self, user_id: &str) -> Option<String>;
    fn user_id_by_session(&self, session_id: &str) -> Option<String>;
}

/// Group membership as seen by the routing and event layers. Routing only
/// reads; the join/leave event handlers mutate.
pub trait GroupDirectory: Send + Sync {
    fn group_sessions(&self, group_id: &str) -> HashSet<String>;
    fn join(&self, group_id: &str, session_id: &str);
    fn leave(&self, group_id: &str, session_id: &str);
}
