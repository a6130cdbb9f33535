//! Request/response envelope exchanged between agents, gateway, and backends
//!
//! A request is transient: created per call, never persisted. A response is
//! always produced, success or structured failure; unhandled errors never
//! cross this boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::error::McpError;

/// One call from an agent to a backend service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpRequest {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Registry key of the target backend
    pub service: String,
    /// Operation name, mapped to `POST {endpoint}/api/{operation}`
    pub operation: String,
    /// Operation payload, forwarded as the downstream request body
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

impl McpRequest {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            service: service.into(),
            operation: operation.into(),
            parameters,
            metadata: RequestMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Caller-supplied call options, threaded through the dispatch path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestMetadata {
    /// Identifier threaded through the request lifecycle for tracing
    pub correlation_id: String,
    /// Per-request timeout override in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Identifier of the calling agent
    pub agent_id: String,
    /// Per-request retry override; the gateway default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            timeout_ms: None,
            priority: None,
            agent_id: "unknown".to_string(),
            retry_policy: None,
        }
    }
}

/// Outcome of one dispatched request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub metadata: ResponseMetadata,
}

impl McpResponse {
    pub fn success(request: &McpRequest, data: Value, metadata: ResponseMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: request.id,
            timestamp: Utc::now(),
            success: true,
            data: Some(data),
            error: None,
            metadata,
        }
    }

    pub fn failure(request: &McpRequest, error: &McpError, metadata: ResponseMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: request.id,
            timestamp: Utc::now(),
            success: false,
            data: None,
            error: Some(ErrorBody::from(error)),
            metadata,
        }
    }
}

/// Bookkeeping attached to every response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Wall-clock time spent inside the dispatcher, in milliseconds
    pub processing_time_ms: u64,
    /// Endpoint of the service the request resolved to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_endpoint: Option<String>,
    /// Retries performed beyond the first attempt
    pub retry_count: u32,
    /// Always false here; caching is a collaborator concern
    pub cache_hit: bool,
}

/// Serialized form of an `McpError` inside a failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// The final attempt's error when retries were exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorBody>>,
}

impl From<&McpError> for ErrorBody {
    fn from(error: &McpError) -> Self {
        match error {
            McpError::Downstream { status, .. } => Self {
                code: error.code().to_string(),
                message: error.to_string(),
                status: *status,
                cause: None,
            },
            McpError::RetryExhausted { last, .. } => Self {
                code: error.code().to_string(),
                message: error.to_string(),
                status: None,
                cause: Some(Box::new(ErrorBody::from(last.as_ref()))),
            },
            _ => Self {
                code: error.code().to_string(),
                message: error.to_string(),
                status: None,
                cause: None,
            },
        }
    }
}
