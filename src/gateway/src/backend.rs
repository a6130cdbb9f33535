//! Downstream HTTP transport for the gateway face
//!
//! One call maps to `POST {endpoint}/api/{operation}` with the request
//! parameters as the JSON body, the service's auth headers, and correlation
//! metadata. Timeouts and non-2xx responses surface as downstream errors so
//! the retry executor and circuit breaker treat them identically to any other
//! failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use mcp_core::{AuthManager, Backend, BackendCall, McpError, ServiceConfig};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// reqwest-backed transport shared by all requests
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    auth: Arc<AuthManager>,
}

impl HttpBackend {
    pub fn new(client: Client, auth: Arc<AuthManager>) -> Self {
        Self { client, auth }
    }

    /// Proxy `GET {endpoint}/api/definition` with the service's auth headers.
    pub async fn fetch_definition(&self, service: &ServiceConfig) -> Result<Value, McpError> {
        let headers = self.auth.build_headers(&service.name, &service.auth)?;
        let url = format!("{}/api/definition", service.endpoint.trim_end_matches('/'));

        let mut request = self.client.get(&url).timeout(service.timeout());
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&service.name, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::downstream_status(
                &service.name,
                status.as_u16(),
                "definition fetch failed",
            ));
        }
        response
            .json()
            .await
            .map_err(|e| McpError::downstream(&service.name, format!("invalid definition body: {}", e)))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, call: BackendCall<'_>) -> Result<Value, McpError> {
        let service = call.service;
        let request = call.request;
        let headers = self.auth.build_headers(&service.name, &service.auth)?;

        let url = format!(
            "{}/api/{}",
            service.endpoint.trim_end_matches('/'),
            request.operation
        );
        debug!(url = %url, timeout_ms = call.timeout.as_millis() as u64, "downstream call");

        let mut builder = self
            .client
            .post(&url)
            .timeout(call.timeout)
            .json(&request.parameters)
            .header("X-Correlation-ID", &request.metadata.correlation_id)
            .header("X-Agent-ID", &request.metadata.agent_id);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&service.name, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&service.name, &e))?;

        if status.is_success() {
            if body.is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        } else {
            Err(McpError::downstream_status(
                &service.name,
                status.as_u16(),
                truncate(&body),
            ))
        }
    }
}

/// Build the pooled HTTP client used for every downstream call.
pub fn create_http_client(default_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(default_timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .user_agent(format!("mcp-gateway/{}", env!("CARGO_PKG_VERSION")))
        .build()
}

fn transport_error(service: &str, error: &reqwest::Error) -> McpError {
    if error.is_timeout() {
        McpError::downstream(service, "downstream call timed out")
    } else {
        McpError::downstream(service, format!("transport failure: {}", error))
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_bounds_error_bodies() {
        let long = "x".repeat(2_000);
        let cut = truncate(&long);
        assert!(cut.len() <= MAX_ERROR_BODY_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_client_builds() {
        assert!(create_http_client(Duration::from_secs(30)).is_ok());
    }
}
