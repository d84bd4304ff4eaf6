use crate::state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// CORS layer built from `DREAM_CORS_ORIGINS`.
///
/// Unset, or set to a list with no parseable origin, allows any origin.
pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = state
        .config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .filter(|v: &axum::http::HeaderValue| !v.is_empty())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
