//! Health Monitor
//!
//! Periodically probes every pool instance's `GET /health` endpoint. An
//! instance is flipped unhealthy after a configurable number of consecutive
//! failures and flipped healthy again after a configurable number of
//! consecutive successes (one by default, so recovery is instant while
//! failure detection is damped).
//!
//! A non-`OK` body, a non-2xx status, and a connection failure all count the
//! same: one failed probe. The HTTP client's default timeout applies.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::config::settings::PoolSettings;
use crate::infrastructure::metrics;
use crate::infrastructure::pool::load_balancer::LoadBalancer;

/// Result of one probe against one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
}

/// Background prober for the server pool.
pub struct HealthMonitor {
    pool: Arc<LoadBalancer>,
    client: reqwest::Client,
    probe_interval: Duration,
    failure_threshold: u32,
    recovery_threshold: u32,
    consecutive_failures: DashMap<String, u32>,
    consecutive_successes: DashMap<String, u32>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<LoadBalancer>, settings: &PoolSettings) -> Self {
        Self {
            pool,
            client: reqwest::Client::new(),
            probe_interval: Duration::from_secs(settings.health_check_interval_secs),
            failure_threshold: settings.failure_threshold,
            recovery_threshold: settings.recovery_threshold,
            consecutive_failures: DashMap::new(),
            consecutive_successes: DashMap::new(),
        }
    }

    /// Probe loop; runs until the task is dropped.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.probe_interval);
        interval.tick().await; // immediate first tick
        loop {
            interval.tick().await;
            self.probe_all().await;
        }
    }

    /// Probe every known instance once.
    pub async fn probe_all(&self) {
        for server in self.pool.all_servers() {
            let outcome = self.probe(&server.url).await;
            self.observe(&server.server_id, outcome);
        }
    }

    /// One probe: `GET {url}/health`, success iff 2xx with the literal body
    /// `OK`.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let health_url = format!("{}/health", url);
        match self.client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) if body == "OK" => ProbeOutcome::Success,
                _ => ProbeOutcome::Failure,
            },
            _ => ProbeOutcome::Failure,
        }
    }

    /// Fold one probe outcome into the per-instance counters and flip health
    /// when a threshold is crossed. Exposed separately from the HTTP probe so
    /// the accounting is testable on its own.
    pub fn observe(&self, server_id: &str, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::Success => {
                self.consecutive_failures.remove(server_id);
                let successes = {
                    let mut entry = self
                        .consecutive_successes
                        .entry(server_id.to_string())
                        .or_insert(0);
                    *entry += 1;
                    *entry
                };
                if successes >= self.recovery_threshold {
                    self.pool.update_health(server_id, true);
                }
            }
            ProbeOutcome::Failure => {
                self.consecutive_successes.remove(server_id);
                metrics::record_probe_failure(server_id);
                let failures = {
                    let mut entry = self
                        .consecutive_failures
                        .entry(server_id.to_string())
                        .or_insert(0);
                    *entry += 1;
                    *entry
                };
                if failures >= self.failure_threshold {
                    self.pool.update_health(server_id, false);
                    tracing::warn!(
                        server_id = %server_id,
                        failures,
                        "Server marked unhealthy after consecutive probe failures"
                    );
                }
            }
        }
    }

    pub fn failure_count(&self, server_id: &str) -> u32 {
        self.consecutive_failures
            .get(server_id)
            .map(|entry| *entry)
            .unwrap_or(0)
    }
}
