//! Shared configuration types for the MCP mesh
//!
//! These structures describe one downstream service each: where it lives, how
//! to authenticate against it, and how aggressively the gateway may call it.
//! They are loaded once at startup, validated, and never mutated afterwards;
//! only the live breaker/limiter state keyed by service name changes at
//! runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Static configuration for one downstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name, the registry key
    pub name: String,
    /// Base endpoint URL of the backend
    pub endpoint: String,
    /// Authentication scheme for downstream calls
    pub auth: AuthConfig,
    /// Token bucket parameters
    pub rate_limit: RateLimitConfig,
    /// Failure-tracking parameters
    pub circuit_breaker: CircuitBreakerConfig,
    /// Default per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Collect configuration problems for this entry. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("service name must not be empty".to_string());
        }
        if self.endpoint.trim().is_empty() {
            problems.push(format!("service '{}': endpoint must not be empty", self.name));
        }
        if self.rate_limit.requests_per_minute == 0 {
            problems.push(format!(
                "service '{}': requests_per_minute must be greater than zero",
                self.name
            ));
        }
        if self.rate_limit.burst_limit == 0 {
            problems.push(format!(
                "service '{}': burst_limit must be greater than zero",
                self.name
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            problems.push(format!(
                "service '{}': failure_threshold must be greater than zero",
                self.name
            ));
        }
        for problem in crate::auth::validate_auth_config(&self.auth) {
            problems.push(format!("service '{}': {}", self.name, problem));
        }
        problems
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "example".to_string(),
            endpoint: "http://localhost:8000".to_string(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            timeout_ms: 30_000,
        }
    }
}

/// Downstream authentication schemes
///
/// Unrecognized scheme names deserialize into `Other` so that a misconfigured
/// service fails with an `AuthenticationError` at request time (and a listed
/// problem at startup validation) instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    Bearer,
    ApiKey,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(untagged)]
    Other(String),
}

/// Authentication configuration for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// Opaque credential material, keyed by scheme-specific names
    /// (`token`, `apiKey`, `accessToken`, `refreshToken`)
    #[serde(default)]
    pub credentials: HashMap<String, String>,
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Bearer,
            credentials: HashMap::from([("token".to_string(), token.into())]),
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::ApiKey,
            credentials: HashMap::from([("apiKey".to_string(), key.into())]),
        }
    }

    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::bearer("development-token")
    }
}

/// Token bucket parameters for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Refill rate: tokens added per 60 000 ms
    pub requests_per_minute: u32,
    /// Bucket capacity; `tokens` never exceeds this
    pub burst_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_limit: 10,
        }
    }
}

/// Failure-tracking parameters for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing, in milliseconds
    pub recovery_timeout_ms: u64,
    /// Probes admitted per half-open period
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            half_open_max_calls: 3,
        }
    }
}

/// Backoff curve for the retry executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Delay factor doubles each attempt: 2^attempt
    Exponential,
    /// Delay factor grows by one each attempt: attempt + 1
    Linear,
}

/// Retry policy, immutable for the lifetime of one call sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_attempts + 1
    pub max_attempts: u32,
    pub backoff_strategy: BackoffStrategy,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Multiply each delay by a uniform factor in [0.5, 1.0]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_strategy: BackoffStrategy::Exponential,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}
