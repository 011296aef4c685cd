use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus how many engine slots are free right now.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let limiter = state.pipeline.engine().limiter();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "portfolio-api",
        "engine": {
            "slots": limiter.bound(),
            "available": limiter.available()
        }
    }))
}
