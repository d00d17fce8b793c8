//! Operational metrics snapshot

use crate::{db, middleware::AppState};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    db::record_pool_metrics(&state.db);

    Json(json!({
        "db_pool": {
            "size": state.db.size(),
            "idle": state.db.num_idle(),
        },
        "version": env!("CARGO_PKG_VERSION"),
        "process_uptime_secs": crate::handlers::health::uptime_secs(),
    }))
}
