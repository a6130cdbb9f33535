//! Process-level health handlers

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Simple liveness probe
pub async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now()
    }))
}

/// Readiness probe: the gateway is ready once the registry is populated
pub async fn readiness(State(state): State<AppState>) -> Json<Value> {
    let ready = !state.registry.is_empty();
    Json(json!({
        "status": if ready { "ready" } else { "not_ready" },
        "services": state.registry.len(),
        "timestamp": chrono::Utc::now()
    }))
}
