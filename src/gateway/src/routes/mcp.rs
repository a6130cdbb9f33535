//! Routes under `/mcp`

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::mcp::gateway_health))
        .route("/services", get(handlers::mcp::list_services))
        .route(
            "/services/:name/definition",
            get(handlers::mcp::service_definition),
        )
        .route(
            "/services/:name/metrics",
            get(handlers::mcp::service_metrics),
        )
        .route("/request", post(handlers::mcp::dispatch_request))
}
