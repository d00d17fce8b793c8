//! Health and readiness probes

use crate::{db, middleware::AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::Lazy;
use serde_json::json;
use std::time::Instant;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Pin the start time; called once during startup
pub fn mark_started() {
    Lazy::force(&START_TIME);
}

/// Seconds since startup
pub fn uptime_secs() -> u64 {
    START_TIME.elapsed().as_secs()
}

/// Liveness: the process is up
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime_secs(),
    }))
}

/// Readiness: the database answers
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    match db::health_check(&state.db).await {
        db::HealthStatus::Healthy => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "healthy",
                "db_latency_ms": start.elapsed().as_millis() as u64,
            })),
        ),
        db::HealthStatus::Unhealthy(reason) => {
            tracing::warn!(reason = %reason, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "database": "unhealthy",
                })),
            )
        }
    }
}
