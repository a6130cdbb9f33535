//! Public routes: process health probes and Prometheus metrics

use axum::{extract::State, routing::get, Router};

use crate::{handlers, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::liveness))
        .route("/readiness", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.encode()
}
