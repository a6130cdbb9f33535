//! MCP Mesh core
//!
//! The resilience-and-dispatch engine shared by the standalone gateway and the
//! embedded agent-side client: service registry, circuit breaker, token-bucket
//! rate limiter with request queueing, retry executor, and auth-header
//! construction, all operating on the `McpRequest`/`McpResponse` envelope.

pub mod auth;
pub mod circuit_breaker;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod events;
pub mod rate_limiter;
pub mod registry;
pub mod retry;

pub use auth::AuthManager;
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use config::{
    AuthConfig, AuthType, BackoffStrategy, CircuitBreakerConfig, RateLimitConfig, RetryPolicy,
    ServiceConfig,
};
pub use dispatch::{health_label, Backend, BackendCall, Dispatcher};
pub use envelope::{ErrorBody, McpRequest, McpResponse, RequestMetadata, ResponseMetadata};
pub use error::{McpError, Result};
pub use events::{EventBus, McpEvent};
pub use rate_limiter::{RateLimiter, RateLimiterSnapshot};
pub use registry::{ServiceRegistry, ServiceState};
pub use retry::run_with_retry;
