//! Server pool: load balancing, health probing, and session affinity.

pub mod affinity;
pub mod health_monitor;
pub mod load_balancer;

pub use affinity::SessionAffinity;
pub use health_monitor::{HealthMonitor, ProbeOutcome};
pub use load_balancer::{LoadBalancer, PoolStats};
