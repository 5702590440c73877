//! Infrastructure layer: metrics and the server pool.

pub mod metrics;
pub mod pool;
