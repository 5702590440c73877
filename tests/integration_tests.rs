//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `api/` - HTTP surface tests
//! - `flow/` - End-to-end dispatch and routing flows
//! - `common/` - Shared test utilities

mod api;
mod common;
mod flow;
