//! Server configuration, loaded from environment variables at startup.

use std::str::FromStr;

/// Which wire convention the model provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmApi {
    /// `POST {base}/chat/completions`
    Chat,
    /// `POST {base}/responses`
    Responses,
}

/// Runtime configuration for dream-server.
///
/// Every field except the API key has a default so the server starts
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://dreams.db?mode=rwc"`).
    pub database_url: String,

    /// Upper bound on pooled database connections.
    pub database_max_connections: u32,

    /// Bearer credential for the model provider. `None` is allowed for
    /// keyless local OpenAI-compatible servers.
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint, without trailing slash.
    pub openai_api_base: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Provider binding used by the analyzer.
    pub llm_api: LlmApi,

    /// `tracing` filter string, e.g. `"info"` or `"debug,sqlx=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm_api = match lookup("DREAM_LLM_API") {
            Some(raw) => LlmApi::from_str(raw.trim()).unwrap_or_else(|_| {
                eprintln!("WARN: DREAM_LLM_API='{raw}' is not one of chat|responses; using 'chat'");
                LlmApi::Chat
            }),
            None => LlmApi::Chat,
        };

        Self {
            bind_address: or_default(&lookup, "DREAM_BIND", "0.0.0.0:8000"),
            database_url: or_default(&lookup, "DATABASE_URL", "sqlite://dreams.db?mode=rwc"),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            openai_api_base: or_default(&lookup, "OPENAI_API_BASE", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_owned(),
            model: or_default(&lookup, "DREAM_MODEL", "gpt-5-mini"),
            llm_api,
            log_level: or_default(&lookup, "DREAM_LOG", "info"),
            log_json: lookup("DREAM_LOG_JSON")
                .map(|v| flag(&v))
                .unwrap_or(false),
            cors_allowed_origins: lookup("DREAM_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
            enable_swagger: lookup("DREAM_ENABLE_SWAGGER")
                .map(|v| flag(&v))
                .unwrap_or(true),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn or_default<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_owned())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
