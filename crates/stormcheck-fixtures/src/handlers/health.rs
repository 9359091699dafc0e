//! Liveness endpoint.

use axum::{response::IntoResponse, Json};

/// Always healthy: the server has no dependencies beyond its data directory.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
