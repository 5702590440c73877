//! Application layer: services and the built-in event set.

pub mod events;
pub mod services;
