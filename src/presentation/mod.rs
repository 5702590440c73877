//! Presentation layer: WebSocket transport and the HTTP surface.

pub mod http;
pub mod websocket;
