//! OpenAI-compatible bindings for [`CompletionBackend`].
//!
//! Two wire conventions are supported and selected with `DREAM_LLM_API`:
//!
//! - [`ChatCompletionsBackend`]: `POST {base}/chat/completions`, understood by
//!   OpenAI and most self-hosted servers (llama.cpp, vLLM, Ollama, ...).
//! - [`ResponsesBackend`]: `POST {base}/responses`, OpenAI's newer API.
//!
//! Neither binding retries or sets its own timeout.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::backend::{AnalyzerError, CompletionBackend, CompletionRequest};
use crate::config::{Config, LlmApi};

/// Connection details shared by both bindings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl ProviderSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_base: cfg.openai_api_base.clone(),
            api_key: cfg.openai_api_key.clone(),
            model: cfg.model.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}

/// Build the HTTP client used for all provider calls.
pub fn http_client() -> Result<Client, AnalyzerError> {
    Ok(Client::builder()
        .user_agent(concat!("dream-server/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Construct the binding selected in `cfg`.
pub fn backend_from_config(
    cfg: &Config,
    client: Client,
) -> Box<dyn CompletionBackend> {
    let settings = ProviderSettings::from_config(cfg);
    match cfg.llm_api {
        LlmApi::Chat => Box::new(ChatCompletionsBackend::new(client, settings)),
        LlmApi::Responses => Box::new(ResponsesBackend::new(client, settings)),
    }
}

async fn post_json(
    client: &Client,
    settings: &ProviderSettings,
    path: &str,
    body: &Value,
) -> Result<Value, AnalyzerError> {
    let url = settings.endpoint(path);
    debug!(%url, model = %settings.model, "calling model provider");

    let mut request = client.post(&url).json(body);
    if let Some(key) = &settings.api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AnalyzerError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

// ── chat/completions ─────────────────────────────────────────────────────────

pub struct ChatCompletionsBackend {
    client: Client,
    settings: ProviderSettings,
}

impl ChatCompletionsBackend {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": request.instructions },
                { "role": "user",   "content": request.input },
            ],
            "max_completion_tokens": request.max_output_tokens,
        });
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for ChatCompletionsBackend {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError> {
        let body = self.request_body(&request);
        let raw = post_json(&self.client, &self.settings, "chat/completions", &body).await?;
        let parsed: ChatCompletionResponse = serde_json::from_value(raw)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AnalyzerError::EmptyResponse)
    }
}

// ── responses ────────────────────────────────────────────────────────────────

pub struct ResponsesBackend {
    client: Client,
    settings: ProviderSettings,
}

impl ResponsesBackend {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "instructions": request.instructions,
            "input": request.input,
            "max_output_tokens": request.max_output_tokens,
        });
        if request.json_output {
            body["text"] = json!({ "format": { "type": "json_object" } });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<ResponsesOutputItem>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputItem {
    #[serde(default)]
    content: Vec<ResponsesContentPart>,
}

#[derive(Debug, Deserialize)]
struct ResponsesContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate every `output_text` part, skipping reasoning and tool items.
fn output_text(response: ResponsesResponse) -> String {
    response
        .output
        .into_iter()
        .flat_map(|item| item.content)
        .filter(|part| part.kind == "output_text")
        .filter_map(|part| part.text)
        .collect()
}

#[async_trait]
impl CompletionBackend for ResponsesBackend {
    fn name(&self) -> &'static str {
        "responses"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError> {
        let body = self.request_body(&request);
        let raw = post_json(&self.client, &self.settings, "responses", &body).await?;
        let text = output_text(serde_json::from_value(raw)?);
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use httpmock::prelude::*;

    fn settings(base: String) -> ProviderSettings {
        ProviderSettings {
            api_base: base,
            api_key: Some("sk-test".into()),
            model: "gpt-5-mini".into(),
        }
    }

    fn request(json_output: bool) -> CompletionRequest {
        CompletionRequest {
            instructions: "be brief".into(),
            input: "I was flying".into(),
            max_output_tokens: 800,
            json_output,
        }
    }

    #[test]
    fn chat_body_requests_json_object_only_when_asked() {
        let backend = ChatCompletionsBackend::new(Client::new(), settings("http://x".into()));
        let plain = backend.request_body(&request(false));
        assert_eq!(plain["messages"][0]["role"], "system");
        assert_eq!(plain["messages"][1]["content"], "I was flying");
        assert_eq!(plain["max_completion_tokens"], 800);
        assert!(plain.get("response_format").is_none());

        let json_body = backend.request_body(&request(true));
        assert_eq!(json_body["response_format"]["type"], "json_object");
    }

    #[test]
    fn responses_body_uses_instructions_and_text_format() {
        let backend = ResponsesBackend::new(Client::new(), settings("http://x".into()));
        let body = backend.request_body(&request(true));
        assert_eq!(body["instructions"], "be brief");
        assert_eq!(body["input"], "I was flying");
        assert_eq!(body["max_output_tokens"], 800);
        assert_eq!(body["text"]["format"]["type"], "json_object");
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let s = settings("http://localhost:5001/v1/".into());
        assert_eq!(s.endpoint("responses"), "http://localhost:5001/v1/responses");
    }

    #[tokio::test]
    async fn chat_backend_returns_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "id": "chatcmpl-1",
                    "choices": [
                        { "index": 0, "message": { "role": "assistant", "content": "Flight means freedom." } }
                    ]
                }));
            })
            .await;

        let backend = ChatCompletionsBackend::new(Client::new(), settings(server.base_url()));
        let text = backend.complete(request(false)).await.unwrap();
        assert_eq!(text, "Flight means freedom.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn chat_backend_maps_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let backend = ChatCompletionsBackend::new(Client::new(), settings(server.base_url()));
        match backend.complete(request(false)).await {
            Err(AnalyzerError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_backend_without_content_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let backend = ChatCompletionsBackend::new(Client::new(), settings(server.base_url()));
        assert!(matches!(
            backend.complete(request(false)).await,
            Err(AnalyzerError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn responses_backend_concatenates_output_text_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/responses")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "id": "resp_1",
                    "output": [
                        { "type": "reasoning", "summary": [] },
                        { "type": "message", "role": "assistant", "content": [
                            { "type": "output_text", "text": "Mountains are ", "annotations": [] },
                            { "type": "output_text", "text": "challenges.", "annotations": [] }
                        ]}
                    ]
                }));
            })
            .await;

        let backend = ResponsesBackend::new(Client::new(), settings(server.base_url()));
        let text = backend.complete(request(false)).await.unwrap();
        assert_eq!(text, "Mountains are challenges.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn keyless_provider_sends_no_authorization() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/responses").header_missing("authorization");
                then.status(200).json_body(json!({
                    "output": [{ "content": [{ "type": "output_text", "text": "ok" }] }]
                }));
            })
            .await;

        let mut s = settings(server.base_url());
        s.api_key = None;
        let backend = ResponsesBackend::new(Client::new(), s);
        assert_eq!(backend.complete(request(false)).await.unwrap(), "ok");
        mock.assert_async().await;
    }
}
