//! Error taxonomy for the dispatch core
//!
//! Every failure a caller can observe is one of these kinds; the dispatcher
//! never lets anything else escape past the response envelope.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, McpError>;

/// Structured failure produced anywhere along the dispatch path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McpError {
    #[error("service not configured: {service}")]
    ServiceNotConfigured { service: String },

    #[error("circuit breaker open for service: {service}")]
    CircuitOpen { service: String },

    #[error("rate limit queue timeout for service: {service}")]
    RateLimitQueueTimeout { service: String },

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("downstream call to '{service}' failed: {message}")]
    Downstream {
        service: String,
        /// HTTP status of the backend response, absent on transport failures
        status: Option<u16>,
        message: String,
    },

    #[error("all {attempts} attempts to '{service}' failed: {last}")]
    RetryExhausted {
        service: String,
        attempts: u32,
        last: Box<McpError>,
    },

    #[error("internal dispatcher error: {message}")]
    Internal { message: String },
}

impl McpError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn downstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Downstream {
            service: service.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn downstream_status(
        service: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Downstream {
            service: service.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable kind for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            McpError::ServiceNotConfigured { .. } => "service_not_configured",
            McpError::CircuitOpen { .. } => "circuit_open",
            McpError::RateLimitQueueTimeout { .. } => "rate_limit_queue_timeout",
            McpError::Authentication { .. } => "authentication_error",
            McpError::Downstream { .. } => "downstream_error",
            McpError::RetryExhausted { .. } => "retry_exhausted",
            McpError::Internal { .. } => "internal_error",
        }
    }

    /// Only downstream failures (including timeouts, which are reported as
    /// downstream failures) are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, McpError::Downstream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            McpError::ServiceNotConfigured {
                service: "s".into()
            }
            .code(),
            "service_not_configured"
        );
        assert_eq!(
            McpError::CircuitOpen {
                service: "s".into()
            }
            .code(),
            "circuit_open"
        );
        assert_eq!(
            McpError::downstream("s", "boom").code(),
            "downstream_error"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(McpError::downstream("s", "timeout").is_retryable());
        assert!(McpError::downstream_status("s", 503, "unavailable").is_retryable());
        assert!(!McpError::authentication("bad type").is_retryable());
        assert!(!McpError::CircuitOpen {
            service: "s".into()
        }
        .is_retryable());
        assert!(!McpError::RateLimitQueueTimeout {
            service: "s".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_retry_exhausted_carries_last_error() {
        let last = McpError::downstream_status("billing", 500, "boom");
        let err = McpError::RetryExhausted {
            service: "billing".into(),
            attempts: 4,
            last: Box::new(last.clone()),
        };
        match err {
            McpError::RetryExhausted { last: inner, .. } => assert_eq!(*inner, last),
            _ => panic!("expected RetryExhausted"),
        }
    }
}
