//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::AppState;

/// GET /health. Reports service and database status.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match crate::db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": state.config.service_name,
                "database": "connected",
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": state.config.service_name,
                    "database": "disconnected",
                })),
            )
        }
    }
}
