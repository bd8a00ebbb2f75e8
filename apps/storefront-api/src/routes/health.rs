//! Liveness check.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    if !state.db.health_check().await {
        return Err(ApiError::Internal("database health check failed".to_string()));
    }

    Ok(ApiResponse::ok(
        "Service is healthy",
        HealthStatus {
            status: "ok",
            database: true,
            version: env!("CARGO_PKG_VERSION"),
        },
    ))
}
