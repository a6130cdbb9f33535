//! Handlers for the `/mcp/*` surface
//!
//! Dispatch results always come back as HTTP 200 with a response envelope;
//! only surface-level problems on the informational routes (unknown service
//! name, unreachable definition endpoint) use HTTP error codes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use mcp_core::{
    health_label, CircuitSnapshot, CircuitState, McpRequest, McpResponse, RateLimiterSnapshot,
};

use crate::error::{GatewayError, Result};
use crate::state::AppState;

/// One entry in the service listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: String,
    pub endpoint: String,
    pub auth_type: mcp_core::AuthType,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceListing {
    pub services: Vec<ServiceSummary>,
}

/// Breaker-derived status of one service in the health report
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: &'static str,
}

/// Per-service resilience state for the metrics route
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub service_name: String,
    pub status: &'static str,
    pub circuit_breaker: CircuitSnapshot,
    pub rate_limiter: RateLimiterSnapshot,
}

/// Aggregate health: worst breaker state across all services wins.
pub async fn gateway_health(State(state): State<AppState>) -> Json<Value> {
    let mut services = Vec::new();
    let mut worst = CircuitState::Closed;

    for service in state.registry.services() {
        let breaker_state = service.breaker.state();
        services.push(ServiceHealth {
            name: service.config.name.clone(),
            status: health_label(breaker_state),
        });
        worst = match (worst, breaker_state) {
            (_, CircuitState::Open) | (CircuitState::Open, _) => CircuitState::Open,
            (_, CircuitState::HalfOpen) | (CircuitState::HalfOpen, _) => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        };
    }
    services.sort_by(|a, b| a.name.cmp(&b.name));

    Json(json!({
        "status": health_label(worst),
        "services": services,
        "timestamp": chrono::Utc::now()
    }))
}

/// List all configured services with their current breaker-derived status.
pub async fn list_services(State(state): State<AppState>) -> Json<ServiceListing> {
    let mut services: Vec<ServiceSummary> = state
        .registry
        .services()
        .map(|service| ServiceSummary {
            name: service.config.name.clone(),
            endpoint: service.config.endpoint.clone(),
            auth_type: service.config.auth.auth_type.clone(),
            status: health_label(service.breaker.state()),
        })
        .collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ServiceListing { services })
}

/// Proxy the service's self-describing definition document.
pub async fn service_definition(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let service = state
        .registry
        .resolve(&name)
        .ok_or_else(|| GatewayError::not_found(format!("service '{}'", name)))?;

    let definition = state
        .backend
        .fetch_definition(&service.config)
        .await
        .map_err(|e| GatewayError::Upstream {
            service: name.clone(),
            message: e.to_string(),
        })?;

    Ok(Json(definition))
}

/// Resilience snapshots for one service.
pub async fn service_metrics(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ServiceMetrics>> {
    let service = state
        .registry
        .resolve(&name)
        .ok_or_else(|| GatewayError::not_found(format!("service '{}'", name)))?;

    let circuit_breaker = service.breaker.snapshot();
    Ok(Json(ServiceMetrics {
        service_name: name,
        status: health_label(circuit_breaker.state),
        circuit_breaker,
        rate_limiter: service.limiter.snapshot(),
    }))
}

/// Dispatch one request envelope through the resilience pipeline.
///
/// Business failures (open circuit, exhausted retries, queue timeout) are
/// still HTTP 200; callers inspect the envelope's `success` flag.
pub async fn dispatch_request(
    State(state): State<AppState>,
    Json(request): Json<McpRequest>,
) -> Json<McpResponse> {
    info!(
        service = %request.service,
        operation = %request.operation,
        correlation_id = %request.metadata.correlation_id,
        "dispatching request"
    );
    Json(state.dispatcher.handle(&request).await)
}
