//! Follow-up conversation about a stored dream.
//!
//! The model is called before anything is written, and the question/answer
//! pair is then stored in one transaction, so a failed call leaves the thread
//! unchanged.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, info};
use utoipa::OpenApi;
use validator::Validate;

use crate::analyzer::{DreamContext, Turn};
use crate::entities::{ChatStore, DreamStore};
use crate::error::ServerError;
use crate::extract::{JsonBody, PathParams};
use crate::schemas::chat::{ChatMessageResponse, ChatRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(post_chat, get_chat_history),
    components(schemas(ChatRequest, ChatMessageResponse))
)]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dreams/{key}/chat", get(get_chat_history).post(post_chat))
}

#[utoipa::path(
    post,
    path = "/dreams/{dream_id}/chat",
    tag = "chat",
    params(("dream_id" = i64, Path, description = "Dream id")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The stored assistant reply", body = ChatMessageResponse),
        (status = 400, description = "Invalid request body"),
        (status = 404, description = "No such dream"),
        (status = 502, description = "Model provider error"),
    )
)]
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    PathParams(dream_id): PathParams<i64>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<Json<ChatMessageResponse>, ServerError> {
    req.validate()?;
    if let Some(body_id) = req.dream_id {
        if body_id != dream_id {
            return Err(ServerError::BadRequest(format!(
                "dream_id {body_id} in body does not match {dream_id} in path"
            )));
        }
    }

    let dream = state
        .store
        .get_dream(dream_id)
        .await?
        .ok_or_else(ServerError::dream_not_found)?;
    let history = state.store.list_messages(dream_id).await?;
    debug!(dream_id, history = history.len(), "answering chat question");

    let turns: Vec<Turn<'_>> = history
        .iter()
        .map(|m| Turn {
            role: m.role,
            content: &m.content,
        })
        .collect();
    let context = DreamContext {
        title: &dream.title,
        description: &dream.description,
        emotions: &dream.emotions,
        interpretation: dream.interpretation.as_deref(),
    };
    let answer = state.analyzer.chat(&context, &turns, &req.message).await?;

    let (_, assistant) = state
        .store
        .append_exchange(dream_id, &req.message, &answer)
        .await?;
    info!(dream_id, message_id = assistant.id, "chat exchange stored");
    Ok(Json(assistant.to_response()))
}

#[utoipa::path(
    get,
    path = "/dreams/{dream_id}/chat",
    tag = "chat",
    params(("dream_id" = i64, Path, description = "Dream id")),
    responses(
        (status = 200, description = "Chat thread, oldest first", body = Vec<ChatMessageResponse>),
        (status = 404, description = "No such dream"),
    )
)]
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    PathParams(dream_id): PathParams<i64>,
) -> Result<Json<Vec<ChatMessageResponse>>, ServerError> {
    if state.store.get_dream(dream_id).await?.is_none() {
        return Err(ServerError::dream_not_found());
    }
    let messages = state.store.list_messages(dream_id).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

#[cfg(test)]
mod test {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::analyzer::testing::ScriptedBackend;
    use crate::analyzer::AnalyzerError;
    use crate::entities::ChatStore;
    use crate::routes::testing::{create_dream, send, test_app};

    async fn ask(app: &axum::Router, dream_id: i64, message: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            &format!("/dreams/{dream_id}/chat"),
            Some(json!({"dream_id": dream_id, "message": message})),
        )
        .await
    }

    #[tokio::test]
    async fn chat_returns_the_stored_assistant_message() {
        let (app, _, backend) = test_app(ScriptedBackend::happy()).await;
        let id = create_dream(&app, "alice", "I was flying over mountains").await;

        let (status, body) = ask(&app, id, "What do the mountains mean?").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "assistant");
        assert_eq!(body["dream_id"], id);
        assert_eq!(body["content"], ScriptedBackend::CHAT_REPLY);

        let chat_call = backend.calls().pop().unwrap();
        assert!(chat_call.instructions.contains("I was flying over mountains"));
        assert!(chat_call.input.contains("No previous conversation"));
    }

    #[tokio::test]
    async fn history_alternates_and_is_time_ordered() {
        let (app, _, _) = test_app(ScriptedBackend::happy()).await;
        let id = create_dream(&app, "alice", "A long corridor").await;
        ask(&app, id, "first question").await;
        ask(&app, id, "second question").await;

        let (status, body) = send(&app, Method::GET, &format!("/dreams/{id}/chat"), None).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body.as_array().unwrap();
        assert_eq!(messages.len(), 4);

        let roles: Vec<&str> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
        assert_eq!(messages[0]["content"], "first question");
        assert_eq!(messages[2]["content"], "second question");

        let stamps: Vec<chrono::DateTime<chrono::Utc>> = messages
            .iter()
            .map(|m| m["created_at"].as_str().unwrap().parse().unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn second_question_replays_earlier_turns() {
        let (app, _, backend) = test_app(ScriptedBackend::happy()).await;
        let id = create_dream(&app, "alice", "A red door").await;
        ask(&app, id, "first question").await;
        ask(&app, id, "second question").await;

        let last = backend.calls().pop().unwrap();
        assert!(last.input.contains("USER: first question"));
        assert!(last.input.contains("User Question:\nsecond question"));
    }

    #[tokio::test]
    async fn missing_dream_is_404_for_both_verbs() {
        let (app, _, backend) = test_app(ScriptedBackend::happy()).await;

        let (status, body) = ask(&app, 999, "hello?").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Dream not found");

        let (status, _) = send(&app, Method::GET, "/dreams/999/chat", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn model_failure_writes_nothing() {
        let backend = ScriptedBackend::new(|req| {
            if req.input.starts_with("Conversation History:") {
                Err(AnalyzerError::Status { status: 503, body: "busy".into() })
            } else {
                Ok("{}".into())
            }
        });
        let (app, state, _) = test_app(backend).await;
        let id = create_dream(&app, "alice", "A storm").await;

        let (status, _) = ask(&app, id, "why the storm?").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(state.store.list_messages(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mismatched_or_empty_body_is_400() {
        let (app, _, _) = test_app(ScriptedBackend::happy()).await;
        let id = create_dream(&app, "alice", "A bridge").await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/dreams/{id}/chat"),
            Some(json!({"dream_id": id + 1, "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = ask(&app, id, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/dreams/{id}/chat"),
            Some(json!({"message": "path id is enough"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "assistant");
    }

    #[tokio::test]
    async fn reply_timestamp_matches_history() {
        let (app, _, _) = test_app(ScriptedBackend::happy()).await;
        let id = create_dream(&app, "alice", "A tide pool").await;
        let (_, reply) = ask(&app, id, "what lives here?").await;

        let (_, history) = send(&app, Method::GET, &format!("/dreams/{id}/chat"), None).await;
        assert_eq!(history[1]["id"], reply["id"]);
        assert_eq!(history[1]["created_at"], reply["created_at"]);
    }

    #[tokio::test]
    async fn body_without_message_is_a_json_400() {
        let (app, _, _) = test_app(ScriptedBackend::happy()).await;
        let id = create_dream(&app, "alice", "A maze").await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/dreams/{id}/chat"),
            Some(json!({"dream_id": id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("message"));
    }
}
