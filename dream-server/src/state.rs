//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::analyzer::DreamAnalyzer;
use crate::config::Config;
use crate::entities::SqliteStore;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Dreams and their chat threads.
    pub store: Arc<SqliteStore>,
    /// Model-backed interpretation, pattern and chat calls.
    pub analyzer: Arc<DreamAnalyzer>,
}
