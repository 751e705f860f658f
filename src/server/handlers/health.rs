use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::server::app::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "proposal-manager",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.store.backend_name()
    }))
}
