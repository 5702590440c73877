//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server binding and pool identity
    pub server: ServerSettings,

    /// Presence registry retention policy
    pub presence: PresenceSettings,

    /// Server pool and health probing configuration
    pub pool: PoolSettings,

    /// WebSocket transport limits
    pub websocket: WebSocketSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// This instance's id within the server pool
    pub server_id: String,
}

/// Retention policy for disconnected connection records.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceSettings {
    /// How long disconnected records are kept, in seconds
    pub retention_secs: u64,

    /// Eviction sweep period in seconds
    pub sweep_interval_secs: u64,
}

/// Server pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Health probe period in seconds
    pub health_check_interval_secs: u64,

    /// Consecutive probe failures before an instance is marked unhealthy
    pub failure_threshold: u32,

    /// Consecutive probe successes before an unhealthy instance recovers
    pub recovery_threshold: u32,

    /// Sibling instances as `id:port` entries
    pub instances: Vec<String>,

    /// Base URL the instance ports are appended to
    pub default_url: String,
}

impl PoolSettings {
    /// Resolve the configured `id:port` entries into `(server_id, url)`
    /// pairs. Malformed entries are skipped with a warning.
    pub fn parsed_instances(&self) -> Vec<(String, String)> {
        self.instances
            .iter()
            .filter_map(|entry| {
                let (id, port) = entry.split_once(':')?;
                let id = id.trim();
                let port = port.trim();
                if id.is_empty() || port.is_empty() {
                    tracing::warn!(entry = %entry, "Skipping malformed pool instance entry");
                    return None;
                }
                Some((id.to_string(), format!("{}:{}", self.default_url, port)))
            })
            .collect()
    }
}

/// WebSocket transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes
    pub max_message_size: usize,

    /// Bound of the per-connection dispatch queue; a full queue applies
    /// backpressure to that connection's reads
    pub dispatch_queue_capacity: usize,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.server_id", "server1")?
            .set_default("presence.retention_secs", 3600)?
            .set_default("presence.sweep_interval_secs", 300)?
            .set_default("pool.health_check_interval_secs", 30)?
            .set_default("pool.failure_threshold", 3)?
            .set_default("pool.recovery_threshold", 1)?
            .set_default("pool.instances", Vec::<String>::new())?
            .set_default("pool.default_url", "http://localhost")?
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.dispatch_queue_capacity", 64)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=8080 -> server.port = 8080
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("server.server_id", std::env::var("SERVER_ID").ok())?
            .set_override_option(
                "pool.instances",
                std::env::var("SERVER_INSTANCES").ok().map(|entries| {
                    entries
                        .split(',')
                        .map(|entry| entry.trim().to_string())
                        .filter(|entry| !entry.is_empty())
                        .collect::<Vec<String>>()
                }),
            )?
            .set_override_option("pool.default_url", std::env::var("DEFAULT_URL").ok())?
            .build()?
            .try_deserialize()
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pool_settings(instances: Vec<&str>) -> PoolSettings {
        PoolSettings {
            health_check_interval_secs: 30,
            failure_threshold: 3,
            recovery_threshold: 1,
            instances: instances.into_iter().map(String::from).collect(),
            default_url: "http://localhost".into(),
        }
    }

    #[test]
    fn parses_instance_entries_into_urls() {
        let settings = pool_settings(vec!["server1:8080", "server2:8081"]);
        assert_eq!(
            settings.parsed_instances(),
            vec![
                ("server1".to_string(), "http://localhost:8080".to_string()),
                ("server2".to_string(), "http://localhost:8081".to_string()),
            ]
        );
    }

    #[test]
    fn skips_malformed_instance_entries() {
        let settings = pool_settings(vec!["server1:8080", "nocolon", ":9000", "server3:"]);
        assert_eq!(
            settings.parsed_instances(),
            vec![("server1".to_string(), "http://localhost:8080".to_string())]
        );
    }
}
