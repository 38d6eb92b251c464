use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::ml_client::MlHealth;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobmatch-api"
    }))
}

/// GET /health/ml
/// Liveness of the inference service. Never errors; a down service is
/// reported as unhealthy.
pub async fn ml_health_handler(State(state): State<AppState>) -> Json<MlHealth> {
    Json(state.ml.health().await)
}
