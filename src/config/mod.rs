//! Configuration management.

pub mod settings;

pub use settings::{
    CorsSettings, PoolSettings, PresenceSettings, ServerSettings, Settings, WebSocketSettings,
};
