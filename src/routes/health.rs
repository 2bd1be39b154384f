use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    database: String,
}

/// Root-level health route: `GET /health`.
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// API-level health route: `GET /api/v1/health`.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check with database connectivity probe.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}
