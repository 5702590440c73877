//! Application services: presence, dispatch, and routing.

pub mod dispatch;
pub mod registry;
pub mod router;

pub use dispatch::{DispatchContext, EventDispatchTable, EventHandler, EventHandlerConfig};
pub use registry::ConnectionRegistry;
pub use router::MessageRouter;
