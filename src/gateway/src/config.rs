//! Gateway configuration
//!
//! Loaded once at startup from an optional `config/default` file, an optional
//! per-environment file, and `MCP__`-prefixed environment variables. Service
//! entries are validated when the registry is built; any problem is fatal
//! before the gateway starts serving.

use serde::Deserialize;

use mcp_core::{RetryPolicy, ServiceConfig};

/// Main configuration for the gateway process
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway-wide retry policy, applied when a request carries none
    #[serde(default)]
    pub default_retry: RetryPolicy,
    /// One entry per downstream service
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Emit JSON-formatted logs instead of human-readable ones
    pub json_logs: bool,
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "mcp_gateway=info,mcp_core=info,tower_http=warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from config files and environment variables.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let environment =
            std::env::var("MCP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::File::with_name(&format!("config/environments/{}", environment))
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("MCP").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            default_retry: RetryPolicy::default(),
            services: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.is_development());
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_deserializes_service_entries() {
        let json = serde_json::json!({
            "server": {"host": "127.0.0.1", "port": 9090},
            "services": [{
                "name": "billing",
                "endpoint": "http://billing:8000",
                "auth": {"type": "api-key", "credentials": {"apiKey": "k"}},
                "rate_limit": {"requests_per_minute": 120, "burst_limit": 20},
                "circuit_breaker": {
                    "failure_threshold": 3,
                    "recovery_timeout_ms": 10000,
                    "half_open_max_calls": 2
                },
                "timeout_ms": 15000
            }]
        });
        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].rate_limit.burst_limit, 20);
        assert!(config.services[0].validate().is_empty());
    }
}
