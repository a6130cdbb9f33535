//! Error handling for the gateway's HTTP surface
//!
//! Business-level failures travel inside `McpResponse` envelopes with HTTP
//! 200; this type covers the rest: unknown resources on the informational
//! routes, proxy failures, configuration problems at startup, and unexpected
//! dispatcher faults.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Upstream proxy error: {0}")]
    Proxy(#[from] reqwest::Error),

    #[error("Upstream service {service} failed: {message}")]
    Upstream { service: String, message: String },

    #[error("Metrics error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Standardized error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl GatewayError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Proxy(_) | GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Configuration(_)
            | GatewayError::ConfigLoad(_)
            | GatewayError::Prometheus(_)
            | GatewayError::Io(_)
            | GatewayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "not_found_error",
            GatewayError::Proxy(_) | GatewayError::Upstream { .. } => "proxy_error",
            GatewayError::Configuration(_) | GatewayError::ConfigLoad(_) => "configuration_error",
            GatewayError::Prometheus(_) => "metrics_error",
            GatewayError::Io(_) => "io_error",
            GatewayError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            error!(error = %self, status = %status_code, "gateway error");
        }
        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            timestamp: chrono::Utc::now(),
        };
        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::not_found("service").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Configuration("bad".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            GatewayError::not_found("service").error_type(),
            "not_found_error"
        );
        assert_eq!(
            GatewayError::Configuration("bad".into()).error_type(),
            "configuration_error"
        );
    }
}
