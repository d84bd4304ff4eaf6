//! In-process [`CompletionBackend`] for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::backend::{AnalyzerError, CompletionBackend, CompletionRequest};

type Responder = dyn Fn(&CompletionRequest) -> Result<String, AnalyzerError> + Send + Sync;

/// Answers every request with a closure and records what it was asked.
///
/// Clones share the call log, so a test can hand one clone to the analyzer
/// and inspect the other.
#[derive(Clone)]
pub struct ScriptedBackend {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedBackend {
    pub const INTERPRETATION: &'static str = "Flying suggests a longing for freedom.";
    pub const SYMBOLS_JSON: &'static str =
        r#"{"symbols":[{"symbol":"mountains","meaning":"obstacles to overcome"}]}"#;
    pub const CHAT_REPLY: &'static str = "The fear may point to a leap you are hesitating over.";

    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, AnalyzerError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// JSON symbols for `json_output` requests, chat reply for chat
    /// requests, interpretation text otherwise.
    pub fn happy() -> Self {
        Self::new(|req| {
            let reply = if req.json_output {
                Self::SYMBOLS_JSON
            } else if req.input.starts_with("Conversation History:") {
                Self::CHAT_REPLY
            } else {
                Self::INTERPRETATION
            };
            Ok(reply.to_owned())
        })
    }

    /// Every request fails as if the provider returned HTTP 500.
    pub fn failing() -> Self {
        Self::new(|_| {
            Err(AnalyzerError::Status {
                status: 500,
                body: "provider down".into(),
            })
        })
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError> {
        let reply = (self.responder)(&request);
        self.calls.lock().unwrap().push(request);
        reply
    }
}
