//! Domain entities.

pub mod connection;
pub mod server_instance;

pub use connection::ConnectionRecord;
pub use server_instance::{ServerInstance, ServerInstanceInfo};
