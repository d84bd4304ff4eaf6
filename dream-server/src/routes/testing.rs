//! Router-level test harness: the real router over an in-memory database and
//! a scripted model backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::analyzer::testing::ScriptedBackend;
use crate::analyzer::DreamAnalyzer;
use crate::config::Config;
use crate::entities::SqliteStore;
use crate::state::AppState;

pub async fn test_app(backend: ScriptedBackend) -> (Router, Arc<AppState>, ScriptedBackend) {
    test_app_with(Config::from_lookup(|_| None), backend).await
}

pub async fn test_app_with(
    config: Config,
    backend: ScriptedBackend,
) -> (Router, Arc<AppState>, ScriptedBackend) {
    let state = Arc::new(AppState {
        config: Arc::new(config),
        store: Arc::new(SqliteStore::in_memory().await),
        analyzer: Arc::new(DreamAnalyzer::new(Box::new(backend.clone()))),
    });
    (super::build(state.clone()), state, backend)
}

/// Send one request and decode the JSON response (`Value::Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Create a dream through the API and return its id.
pub async fn create_dream(app: &Router, user_id: &str, description: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/dreams",
        Some(json!({
            "user_id": user_id,
            "title": "Dream",
            "description": description,
            "emotions": ["curiosity"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body["id"].as_i64().unwrap()
}
