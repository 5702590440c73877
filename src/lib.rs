//! # Chat Relay Library
//!
//! Presence tracking and message routing core for a real-time chat backend:
//!
//! - WebSocket transport with per-session frame reassembly
//! - Event dispatch table mapping event names to handlers and routing policy
//! - Message router resolving SELF/OTHERS/GROUP/BROADCAST/SESSION/USER
//!   directives into concrete deliveries
//! - Server pool with round-robin/least-loaded selection, health probing,
//!   and session affinity
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, envelopes, routing vocabulary, and the
//!   ports the core consumes
//! - **Application Layer**: Registry, dispatch, routing services, and the
//!   built-in event set
//! - **Infrastructure Layer**: Metrics and the server pool
//! - **Presentation Layer**: WebSocket transport and the HTTP surface
//!
//! ## Module Structure
//!
//! ```text
//! chat_relay/
//! +-- config/        Configuration management
//! +-- domain/        Entities, envelopes, routes, and ports
//! +-- application/   Registry, dispatch, router, event handlers
//! +-- infrastructure/ Metrics and the server pool
//! +-- presentation/  WebSocket transport and HTTP routes
//! +-- shared/        Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core vocabulary and ports
pub mod domain;

// Application layer - Routing core services
pub mod application;

// Infrastructure layer - Metrics and server pool
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
