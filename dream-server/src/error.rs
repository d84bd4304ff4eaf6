//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** Upstream, Database and Internal errors are logged with
//! full detail but only a generic message is returned to the caller, so
//! provider responses, SQL or API keys never leak to clients.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::analyzer::AnalyzerError;

/// All errors that can occur in the dream-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the model provider.
    #[error("model provider error: {0}")]
    Upstream(#[from] AnalyzerError),

    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// A failure on our side that is not a database or provider error,
    /// e.g. a route registered without the parameters its handler extracts.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn dream_not_found() -> Self {
        ServerError::NotFound("Dream not found".to_owned())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),

            ServerError::Upstream(e) => {
                error!(error = %e, "model provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "dream analysis is temporarily unavailable".to_owned(),
                )
            }
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

/// Map an axum extractor rejection by its status class.
fn from_rejection(status: StatusCode, text: String) -> ServerError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(text)
    } else if status.is_server_error() {
        ServerError::Internal(text)
    } else {
        ServerError::BadRequest(text)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_owned());
                format!("{field} {reason}")
            })
            .collect();
        fields.sort();
        ServerError::BadRequest(fields.join("; "))
    }
}
