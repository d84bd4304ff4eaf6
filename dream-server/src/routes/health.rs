//! Service directory and health / heartbeat endpoints.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_root, get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
}

/// Static description of the service and its endpoints.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service name, version and endpoint directory", body = Value)
    )
)]
pub async fn get_root() -> Json<Value> {
    Json(json!({
        "message": "Dream Interpreter API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "create_dream":  "POST /dreams",
            "get_dreams":    "GET /dreams/{user_id}",
            "get_dream":     "GET /dreams/{user_id}/{dream_id}",
            "get_patterns":  "GET /dreams/{user_id}/patterns",
            "chat":          "POST /dreams/{dream_id}/chat",
            "chat_history":  "GET /dreams/{dream_id}/chat",
            "delete_dream":  "DELETE /dreams/{dream_id}",
            "health":        "GET /health",
        }
    }))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "healthy", "version": "..."}` with HTTP 200.
/// Load-balancers and monitoring systems should poll this endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status":  "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
