//! MCP Mesh gateway
//!
//! Standalone HTTP facade over the resilience-and-dispatch core: agents POST
//! request envelopes to `/mcp/request` and the gateway runs the circuit
//! breaker, rate limiter, and retry pipeline before proxying to the
//! configured downstream service.

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{Config, ObservabilityConfig, ServerConfig};
pub use error::{GatewayError, Result};
pub use state::AppState;

use axum::Router;

/// Build the application router with all middleware and routes
pub fn build_router(state: AppState) -> Router {
    use tower::ServiceBuilder;
    use tower_http::{
        cors::CorsLayer, request_id::SetRequestIdLayer, trace::TraceLayer,
    };

    Router::new()
        .nest("/mcp", routes::mcp::router())
        .merge(routes::public::router())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(
                    tower_http::request_id::MakeRequestUuid,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
