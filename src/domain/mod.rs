//! Domain layer: entities, envelopes, routing directives, and ports.

pub mod entities;
pub mod envelope;
pub mod ports;
pub mod routing;

pub use entities::{ConnectionRecord, ServerInstance, ServerInstanceInfo};
pub use envelope::{EventPayload, InboundFrame, OutboundFrame};
pub use ports::{EventPublisher, GroupDirectory, UserSessionIndex};
pub use routing::{Route, RouteContext};
