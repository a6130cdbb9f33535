//! Gateway transport for the client face
//!
//! Instead of calling backend services directly, the client forwards the
//! whole request envelope to `POST {gateway}/mcp/request` and unwraps the
//! gateway's response envelope. Remote business failures are folded back into
//! the local error taxonomy so the client-side breaker and retry executor
//! treat them exactly like direct downstream failures.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use mcp_core::{Backend, BackendCall, ErrorBody, McpError, McpResponse};

/// reqwest transport that forwards envelopes to a remote gateway
#[derive(Clone, Debug)]
pub struct GatewayBackend {
    client: Client,
    gateway_url: String,
}

impl GatewayBackend {
    pub fn new(client: Client, gateway_url: impl Into<String>) -> Self {
        let mut gateway_url = gateway_url.into();
        while gateway_url.ends_with('/') {
            gateway_url.pop();
        }
        Self {
            client,
            gateway_url,
        }
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }
}

#[async_trait]
impl Backend for GatewayBackend {
    async fn call(&self, call: BackendCall<'_>) -> Result<Value, McpError> {
        let service = &call.service.name;
        let url = format!("{}/mcp/request", self.gateway_url);
        debug!(url = %url, service = %service, "forwarding envelope to gateway");

        let response = self
            .client
            .post(&url)
            .timeout(call.timeout)
            .json(call.request)
            .send()
            .await
            .map_err(|e| transport_error(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::downstream_status(
                service,
                status.as_u16(),
                "gateway rejected the request",
            ));
        }

        let envelope: McpResponse = response
            .json()
            .await
            .map_err(|e| McpError::downstream(service, format!("invalid gateway response: {}", e)))?;

        if envelope.success {
            Ok(envelope.data.unwrap_or(Value::Null))
        } else {
            let body = envelope.error.unwrap_or(ErrorBody {
                code: "internal_error".to_string(),
                message: "gateway reported failure without an error body".to_string(),
                status: None,
                cause: None,
            });
            Err(remote_error(service, body))
        }
    }
}

/// Fold the gateway's serialized error back into the local taxonomy.
///
/// Authentication failures stay non-retryable; everything else becomes a
/// downstream error so the local retry executor and breaker apply to it.
fn remote_error(service: &str, body: ErrorBody) -> McpError {
    match body.code.as_str() {
        "authentication_error" => McpError::authentication(body.message),
        _ => match body.status {
            Some(status) => McpError::downstream_status(service, status, body.message),
            None => McpError::downstream(service, format!("{}: {}", body.code, body.message)),
        },
    }
}

fn transport_error(service: &str, error: &reqwest::Error) -> McpError {
    if error.is_timeout() {
        McpError::downstream(service, "gateway call timed out")
    } else {
        McpError::downstream(service, format!("gateway unreachable: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_core::McpError;

    #[test]
    fn test_remote_auth_error_is_not_retryable() {
        let body = ErrorBody {
            code: "authentication_error".to_string(),
            message: "bad token".to_string(),
            status: None,
            cause: None,
        };
        let error = remote_error("billing", body);
        assert!(matches!(error, McpError::Authentication { .. }));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_remote_business_failure_is_retryable_downstream() {
        let body = ErrorBody {
            code: "retry_exhausted".to_string(),
            message: "all attempts failed".to_string(),
            status: Some(502),
            cause: None,
        };
        let error = remote_error("billing", body);
        assert!(matches!(
            error,
            McpError::Downstream {
                status: Some(502),
                ..
            }
        ));
        assert!(error.is_retryable());
    }
}
