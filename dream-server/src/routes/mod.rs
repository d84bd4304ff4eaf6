//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI document (disable with `DREAM_ENABLE_SWAGGER=false`)
//! - Service directory and health routes
//! - `/dreams` CRUD, pattern and chat routes
//!
//! Literal segments (`patterns`, `chat`) win over the `{dream_id}` parameter
//! at the same position, so `/dreams/alice/patterns` never reaches
//! [`dreams::get_dream`].

mod chat;
pub mod doc;
mod dreams;
mod health;

#[cfg(test)]
pub(crate) mod testing;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use crate::middleware::{cors, trace};
use crate::state::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

/// Largest request body the JSON extractors accept; larger ones get a 413.
pub const MAX_REQUEST_BODY: usize = 64 * 1024;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(dreams::router())
        .merge(chat::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}
