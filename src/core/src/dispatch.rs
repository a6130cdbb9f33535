//! The dispatcher: resolve, gate, retry, normalize
//!
//! Given an inbound `McpRequest`, the dispatcher resolves the target service
//! from the registry, consults its circuit breaker, takes a rate-limit token
//! (possibly suspending), then runs the transport call under the retry
//! executor and normalizes whatever happened into an `McpResponse`. The
//! transport itself is behind the `Backend` trait: the gateway face calls the
//! downstream service directly, the client face forwards the envelope to a
//! remote gateway, and both run this exact code path for defense in depth.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::RetryPolicy;
use crate::envelope::{McpRequest, McpResponse, ResponseMetadata};
use crate::error::McpError;
use crate::events::{EventBus, McpEvent};
use crate::registry::ServiceRegistry;

/// One attempt's worth of transport context
pub struct BackendCall<'a> {
    pub service: &'a crate::config::ServiceConfig,
    pub request: &'a McpRequest,
    /// Resolved per-call timeout: request override or the service default
    pub timeout: Duration,
}

/// Transport seam between the dispatch algorithm and the wire
#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(&self, call: BackendCall<'_>) -> Result<Value, McpError>;
}

/// Request-handling core shared by the gateway and client faces
#[derive(Debug)]
pub struct Dispatcher<B: Backend> {
    registry: Arc<ServiceRegistry>,
    backend: B,
    default_retry: RetryPolicy,
    events: EventBus,
}

impl<B: Backend> Dispatcher<B> {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        backend: B,
        default_retry: RetryPolicy,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            backend,
            default_retry,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Handle one request end to end. Always returns a response envelope;
    /// every failure mode in the taxonomy terminates here as a structured
    /// error, nothing propagates to the transport layer.
    #[instrument(skip_all, fields(
        service = %request.service,
        operation = %request.operation,
        correlation_id = %request.metadata.correlation_id,
    ))]
    pub async fn handle(&self, request: &McpRequest) -> McpResponse {
        let started = Instant::now();

        // Unknown services fail closed, before any state is touched.
        let Some(state) = self.registry.resolve(&request.service) else {
            let error = McpError::ServiceNotConfigured {
                service: request.service.clone(),
            };
            warn!("request for unconfigured service");
            return self.failure(request, &error, started, None, 0);
        };
        let endpoint = state.config.endpoint.clone();

        if !state.breaker.is_admitted() {
            let error = McpError::CircuitOpen {
                service: request.service.clone(),
            };
            debug!("circuit open, failing fast");
            return self.failure(request, &error, started, Some(endpoint), 0);
        }

        if let Err(error) = state.limiter.acquire().await {
            return self.failure(request, &error, started, Some(endpoint), 0);
        }

        let policy = request
            .metadata
            .retry_policy
            .clone()
            .unwrap_or_else(|| self.default_retry.clone());
        let timeout = request
            .metadata
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| state.config.timeout());

        let (result, retries) = crate::retry::run_with_retry(&policy, |attempt| {
            let state = Arc::clone(&state);
            async move {
                if attempt > 0 {
                    debug!(attempt, "retrying downstream call");
                }
                let outcome = self
                    .backend
                    .call(BackendCall {
                        service: &state.config,
                        request,
                        timeout,
                    })
                    .await;
                // Every failed downstream attempt counts against the breaker,
                // whether or not a retry follows.
                if matches!(outcome, Err(McpError::Downstream { .. })) {
                    state.breaker.record_failure();
                }
                outcome
            }
        })
        .await;

        match result {
            Ok(data) => {
                state.breaker.record_success();
                let elapsed = started.elapsed().as_millis() as u64;
                self.events.emit(McpEvent::RequestCompleted {
                    service: request.service.clone(),
                    operation: request.operation.clone(),
                    success: true,
                    retries,
                    elapsed_ms: elapsed,
                });
                McpResponse::success(
                    request,
                    data,
                    ResponseMetadata {
                        processing_time_ms: elapsed,
                        service_endpoint: Some(endpoint),
                        retry_count: retries,
                        cache_hit: false,
                    },
                )
            }
            Err(last) => {
                let error = match last {
                    McpError::Downstream { .. } => McpError::RetryExhausted {
                        service: request.service.clone(),
                        attempts: retries + 1,
                        last: Box::new(last),
                    },
                    other => other,
                };
                self.failure(request, &error, started, Some(endpoint), retries)
            }
        }
    }

    fn failure(
        &self,
        request: &McpRequest,
        error: &McpError,
        started: Instant,
        endpoint: Option<String>,
        retries: u32,
    ) -> McpResponse {
        let elapsed = started.elapsed().as_millis() as u64;
        self.events.emit(McpEvent::RequestCompleted {
            service: request.service.clone(),
            operation: request.operation.clone(),
            success: false,
            retries,
            elapsed_ms: elapsed,
        });
        McpResponse::failure(
            request,
            error,
            ResponseMetadata {
                processing_time_ms: elapsed,
                service_endpoint: endpoint,
                retry_count: retries,
                cache_hit: false,
            },
        )
    }
}

/// Convenience used by both faces for health reporting.
pub fn health_label(state: crate::circuit_breaker::CircuitState) -> &'static str {
    match state {
        crate::circuit_breaker::CircuitState::Closed => "healthy",
        crate::circuit_breaker::CircuitState::HalfOpen => "recovering",
        crate::circuit_breaker::CircuitState::Open => "unhealthy",
    }
}
