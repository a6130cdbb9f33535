//! Embedded MCP client
//!
//! Owns a local registry mirroring the gateway's service configs and runs the
//! full resilience pipeline before any envelope leaves the process.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use mcp_core::{
    Dispatcher, EventBus, McpEvent, McpRequest, McpResponse, RequestMetadata, ServiceRegistry,
};

use crate::backend::GatewayBackend;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Gateway-reported health, as served by `GET /mcp/health`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayHealth {
    pub status: String,
    #[serde(default)]
    pub services: Vec<ServiceHealth>,
}

/// One service's breaker-derived status in the gateway health report
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: String,
}

/// Agent-side dispatch client
#[derive(Debug)]
pub struct McpClient {
    agent_id: String,
    registry: Arc<ServiceRegistry>,
    dispatcher: Dispatcher<GatewayBackend>,
    http: reqwest::Client,
    gateway_url: String,
    events: EventBus,
}

impl McpClient {
    /// Build a client from configuration. Service config problems are
    /// aggregated and fatal, mirroring gateway startup.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let events = EventBus::default();
        let registry = ServiceRegistry::from_configs(config.services, &events)
            .map(Arc::new)
            .map_err(|problems| ClientError::Configuration(problems.join("; ")))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("mcp-client/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let backend = GatewayBackend::new(http.clone(), config.gateway_url);
        let gateway_url = backend.gateway_url().to_string();
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            backend,
            config.default_retry,
            events.clone(),
        );

        registry.spawn_drain();
        info!(
            agent_id = %config.agent_id,
            gateway = %gateway_url,
            services = registry.len(),
            "mcp client initialized"
        );

        Ok(Self {
            agent_id: config.agent_id,
            registry,
            dispatcher,
            http,
            gateway_url,
            events,
        })
    }

    /// Dispatch one operation with default metadata.
    pub async fn request(
        &self,
        service: impl Into<String>,
        operation: impl Into<String>,
        parameters: Value,
    ) -> McpResponse {
        let metadata = RequestMetadata {
            agent_id: self.agent_id.clone(),
            ..RequestMetadata::default()
        };
        self.request_with_metadata(service, operation, parameters, metadata)
            .await
    }

    /// Dispatch with full caller-supplied metadata (correlation id, timeout
    /// and retry overrides).
    pub async fn request_with_metadata(
        &self,
        service: impl Into<String>,
        operation: impl Into<String>,
        parameters: Value,
        metadata: RequestMetadata,
    ) -> McpResponse {
        let request = McpRequest::new(service, operation, parameters).with_metadata(metadata);
        self.dispatcher.handle(&request).await
    }

    /// Ask the gateway for its aggregate health.
    pub async fn health_check(&self) -> Result<GatewayHealth> {
        let url = format!("{}/mcp/health", self.gateway_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::GatewayStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Subscribe to breaker transitions and request completions.
    pub fn subscribe(&self) -> broadcast::Receiver<McpEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_core::ServiceConfig;

    #[tokio::test]
    async fn test_invalid_service_config_is_fatal() {
        let config = ClientConfig {
            services: vec![ServiceConfig {
                name: "".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = McpClient::new(config).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_trailing_slash_on_gateway_url_is_normalized() {
        let config = ClientConfig {
            gateway_url: "http://gw:8080/".to_string(),
            ..Default::default()
        };
        let client = McpClient::new(config).unwrap();
        assert_eq!(client.gateway_url, "http://gw:8080");
    }
}
