use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while talking to the model provider.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Transport failure (DNS, TLS, connection reset, body read, ...).
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but produced no text.
    #[error("model provider returned no text")]
    EmptyResponse,

    /// Provider payload or model output was not the JSON we expected.
    #[error("invalid JSON from model provider: {0}")]
    Json(#[from] serde_json::Error),
}

/// One provider call: a system-level instruction plus a single user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub instructions: String,
    pub input: String,
    pub max_output_tokens: u32,
    /// Ask the provider to constrain output to a JSON object.
    pub json_output: bool,
}

/// A binding to an external text-generation API.
///
/// The analyzer only ever needs "instructions + input in, text out", so each
/// provider convention is one implementation of this trait.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short binding name used in logs.
    fn name(&self) -> &'static str;

    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError>;
}
