//! Dream CRUD and cross-dream pattern routes.
//!
//! `/dreams/{key}` is the owner id for `GET` and the dream id for `DELETE`;
//! axum requires one parameter name per path position.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::{DreamStore, NewDream};
use crate::error::ServerError;
use crate::extract::{JsonBody, PathParams};
use crate::schemas::dream::{
    CreateDreamRequest, DeleteResponse, DreamResponse, PatternResponse, SymbolResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(create_dream, list_dreams, get_dream, get_patterns, delete_dream),
    components(schemas(
        CreateDreamRequest,
        DreamResponse,
        SymbolResponse,
        PatternResponse,
        DeleteResponse
    ))
)]
pub struct DreamsApi;

/// Register dream routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dreams",                  post(create_dream))
        .route("/dreams/{key}",            get(list_dreams).delete(delete_dream))
        .route("/dreams/{key}/patterns",   get(get_patterns))
        .route("/dreams/{key}/{dream_id}", get(get_dream))
}

#[utoipa::path(
    post,
    path = "/dreams",
    tag = "dreams",
    request_body = CreateDreamRequest,
    responses(
        (status = 200, description = "Dream interpreted and stored", body = DreamResponse),
        (status = 400, description = "Invalid request body"),
        (status = 502, description = "Model provider failed to interpret the dream"),
        (status = 500, description = "Database error"),
    )
)]
pub async fn create_dream(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateDreamRequest>,
) -> Result<Json<DreamResponse>, ServerError> {
    req.validate()?;

    let analysis = state.analyzer.analyze(&req.description, &req.emotions).await?;
    let dream = state
        .store
        .insert_dream(NewDream {
            user_id: req.user_id,
            title: req.title,
            description: req.description,
            emotions: req.emotions,
            interpretation: analysis.interpretation,
            symbols: analysis.symbols,
        })
        .await?;

    info!(
        dream_id = dream.id,
        user_id = %dream.user_id,
        symbols = dream.symbols.len(),
        "dream stored"
    );
    Ok(Json(dream.to_response()))
}

#[utoipa::path(
    get,
    path = "/dreams/{user_id}",
    tag = "dreams",
    params(("user_id" = String, Path, description = "Owner of the dreams")),
    responses(
        (status = 200, description = "Owner's dreams, newest first", body = Vec<DreamResponse>),
        (status = 500, description = "Database error"),
    )
)]
pub async fn list_dreams(
    State(state): State<Arc<AppState>>,
    PathParams(user_id): PathParams<String>,
) -> Result<Json<Vec<DreamResponse>>, ServerError> {
    let dreams = state.store.list_dreams_by_owner(&user_id).await?;
    Ok(Json(dreams.iter().map(|d| d.to_response()).collect()))
}

#[utoipa::path(
    get,
    path = "/dreams/{user_id}/{dream_id}",
    tag = "dreams",
    params(
        ("user_id" = String, Path, description = "Owner of the dream"),
        ("dream_id" = i64, Path, description = "Dream id"),
    ),
    responses(
        (status = 200, description = "The dream", body = DreamResponse),
        (status = 404, description = "No such dream for this owner"),
    )
)]
pub async fn get_dream(
    State(state): State<Arc<AppState>>,
    PathParams((user_id, dream_id)): PathParams<(String, i64)>,
) -> Result<Json<DreamResponse>, ServerError> {
    state
        .store
        .get_dream_for_owner(&user_id, dream_id)
        .await?
        .map(|d| Json(d.to_response()))
        .ok_or_else(ServerError::dream_not_found)
}

#[utoipa::path(
    get,
    path = "/dreams/{user_id}/patterns",
    tag = "dreams",
    params(("user_id" = String, Path, description = "Owner of the dreams")),
    responses(
        (status = 200, description = "Pattern analysis, or a notice when fewer than 2 dreams exist", body = PatternResponse),
        (status = 502, description = "Model provider error"),
    )
)]
pub async fn get_patterns(
    State(state): State<Arc<AppState>>,
    PathParams(user_id): PathParams<String>,
) -> Result<Json<PatternResponse>, ServerError> {
    let dreams = state.store.list_dreams_by_owner(&user_id).await?;
    let descriptions: Vec<&str> = dreams.iter().map(|d| d.description.as_str()).collect();
    let report = state.analyzer.find_patterns(&descriptions).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    delete,
    path = "/dreams/{dream_id}",
    tag = "dreams",
    params(("dream_id" = i64, Path, description = "Dream id")),
    responses(
        (status = 200, description = "Dream and its chat thread deleted", body = DeleteResponse),
        (status = 404, description = "No such dream"),
    )
)]
pub async fn delete_dream(
    State(state): State<Arc<AppState>>,
    PathParams(dream_id): PathParams<i64>,
) -> Result<Json<DeleteResponse>, ServerError> {
    if !state.store.delete_dream(dream_id).await? {
        return Err(ServerError::dream_not_found());
    }
    info!(dream_id, "dream deleted");
    Ok(Json(DeleteResponse {
        message: "Dream deleted successfully".to_owned(),
    }))
}
