//! Client configuration

use serde::{Deserialize, Serialize};

use mcp_core::{RetryPolicy, ServiceConfig};

/// Configuration for one embedded client instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the gateway, e.g. `http://mcp-gateway:8080`
    pub gateway_url: String,
    /// Identifier of the calling agent, stamped on every request
    pub agent_id: String,
    /// Per-service resilience configs, mirroring the gateway's registry
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub default_retry: RetryPolicy,
    /// Fallback timeout for gateway calls, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            agent_id: "unknown".to_string(),
            services: Vec::new(),
            default_retry: RetryPolicy::default(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
