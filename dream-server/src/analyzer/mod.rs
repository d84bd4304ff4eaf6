//! Dream analyzer: the boundary between domain data and the model provider.
//!
//! [`DreamAnalyzer`] turns dreams and chat threads into prompts, sends them
//! through an injected [`CompletionBackend`], and turns the replies back into
//! domain values. It holds no state besides the backend, so one instance is
//! shared by every request.
//!
//! Failure policy:
//! - interpretation, pattern and chat calls propagate [`AnalyzerError`];
//! - symbol extraction never fails, it degrades to an empty list.

pub mod backend;
pub mod openai;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AnalyzerError, CompletionBackend, CompletionRequest};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::entities::{ChatRole, Symbol};

/// Most recent dreams considered by pattern analysis.
pub const PATTERN_WINDOW: usize = 5;
/// Fewest dreams for which pattern analysis is attempted.
pub const PATTERN_MIN_DREAMS: usize = 2;
/// Most recent chat turns replayed to the model.
pub const CHAT_HISTORY_WINDOW: usize = 5;

pub const INSUFFICIENT_DATA_MESSAGE: &str = "Need at least 2 dreams to identify patterns";

const INTERPRETATION_MAX_TOKENS: u32 = 1500;
const SYMBOL_MAX_TOKENS: u32 = 800;
const PATTERN_MAX_TOKENS: u32 = 1000;
const CHAT_MAX_TOKENS: u32 = 800;

/// Result of analysing a single dream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DreamAnalysis {
    pub interpretation: String,
    pub symbols: Vec<Symbol>,
}

/// Outcome of a cross-dream pattern request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternReport {
    /// The model's pattern summary over `dreams_analyzed` dreams.
    Analysis {
        pattern_analysis: String,
        dreams_analyzed: usize,
    },
    /// Too few dreams to compare; the model was not called.
    InsufficientData { message: String, dreams_count: usize },
}

/// The stored dream a chat thread is about.
#[derive(Debug, Clone, Copy)]
pub struct DreamContext<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub emotions: &'a [String],
    pub interpretation: Option<&'a str>,
}

/// One earlier message of a chat thread.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub role: ChatRole,
    pub content: &'a str,
}

pub struct DreamAnalyzer {
    backend: Box<dyn CompletionBackend>,
}

impl std::fmt::Debug for DreamAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DreamAnalyzer({})", self.backend.name())
    }
}

impl DreamAnalyzer {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Interpret a dream and extract its symbols (two provider calls).
    ///
    /// Only the interpretation call can fail this operation.
    pub async fn analyze(
        &self,
        description: &str,
        emotions: &[String],
    ) -> Result<DreamAnalysis, AnalyzerError> {
        let interpretation = self
            .backend
            .complete(CompletionRequest {
                instructions: prompts::INTERPRETATION_INSTRUCTIONS.to_owned(),
                input: prompts::interpretation_prompt(description, emotions),
                max_output_tokens: INTERPRETATION_MAX_TOKENS,
                json_output: false,
            })
            .await
            .inspect_err(|e| warn!(backend = self.backend.name(), error = %e, "dream interpretation failed"))?;

        let symbols = self.extract_symbols(description).await;
        info!(
            interpretation_len = interpretation.len(),
            symbols = symbols.len(),
            "dream analyzed"
        );
        Ok(DreamAnalysis {
            interpretation,
            symbols,
        })
    }

    /// Ask the model for the dream's symbols as JSON. Any failure yields `[]`.
    pub async fn extract_symbols(&self, description: &str) -> Vec<Symbol> {
        let reply = self
            .backend
            .complete(CompletionRequest {
                instructions: prompts::SYMBOL_INSTRUCTIONS.to_owned(),
                input: prompts::symbol_prompt(description),
                max_output_tokens: SYMBOL_MAX_TOKENS,
                json_output: true,
            })
            .await;

        let parsed = reply.and_then(|text| parse_symbols(&text));
        match parsed {
            Ok(symbols) => symbols,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "symbol extraction failed; storing no symbols");
                Vec::new()
            }
        }
    }

    /// Look for recurring themes across an owner's dreams.
    ///
    /// `descriptions` must be ordered newest first; only the first
    /// [`PATTERN_WINDOW`] are sent.
    pub async fn find_patterns<S: AsRef<str>>(
        &self,
        descriptions: &[S],
    ) -> Result<PatternReport, AnalyzerError> {
        if descriptions.len() < PATTERN_MIN_DREAMS {
            debug!(dreams = descriptions.len(), "not enough dreams for pattern analysis");
            return Ok(PatternReport::InsufficientData {
                message: INSUFFICIENT_DATA_MESSAGE.to_owned(),
                dreams_count: descriptions.len(),
            });
        }

        let window = &descriptions[..descriptions.len().min(PATTERN_WINDOW)];
        let pattern_analysis = self
            .backend
            .complete(CompletionRequest {
                instructions: prompts::PATTERN_INSTRUCTIONS.to_owned(),
                input: prompts::pattern_prompt(window),
                max_output_tokens: PATTERN_MAX_TOKENS,
                json_output: false,
            })
            .await?;

        Ok(PatternReport::Analysis {
            pattern_analysis,
            dreams_analyzed: window.len(),
        })
    }

    /// Answer a follow-up question about a dream.
    ///
    /// `history` is the whole thread, oldest first; only the last
    /// [`CHAT_HISTORY_WINDOW`] turns are replayed. The reply is returned
    /// verbatim and nothing is persisted here.
    pub async fn chat(
        &self,
        dream: &DreamContext<'_>,
        history: &[Turn<'_>],
        question: &str,
    ) -> Result<String, AnalyzerError> {
        let recent = &history[history.len().saturating_sub(CHAT_HISTORY_WINDOW)..];
        self.backend
            .complete(CompletionRequest {
                instructions: prompts::chat_instructions(dream),
                input: prompts::chat_prompt(recent, question),
                max_output_tokens: CHAT_MAX_TOKENS,
                json_output: false,
            })
            .await
    }
}

/// Parse the symbol reply: `{"symbols": [...]}`, `{"items": [...]}`, a bare
/// array, or `{}`.
///
/// `symbols` wins when both keys are arrays. Entries that are not
/// `{symbol, meaning}` objects are skipped, not fatal. A Markdown code fence
/// around the object is tolerated because some providers ignore the JSON
/// response format.
fn parse_symbols(text: &str) -> Result<Vec<Symbol>, AnalyzerError> {
    let reply: Value = serde_json::from_str(strip_code_fence(text))?;
    let list = match &reply {
        Value::Array(_) => Some(&reply),
        _ => ["symbols", "items"]
            .into_iter()
            .filter_map(|key| reply.get(key))
            .find(|v| v.is_array()),
    };
    let Some(Value::Array(entries)) = list else {
        return Ok(Vec::new());
    };

    let symbols: Vec<Symbol> = entries
        .iter()
        .filter_map(|entry| Symbol::deserialize(entry).ok())
        .collect();
    if symbols.len() < entries.len() {
        debug!(kept = symbols.len(), total = entries.len(), "skipped malformed symbol entries");
    }
    Ok(symbols)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
