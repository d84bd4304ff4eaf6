use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One symbol the model found in a dream, with its suggested meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub symbol: String,
    #[serde(default)]
    pub meaning: String,
}

/// A row in the `dreams` table.
#[derive(Debug, Clone)]
pub struct Dream {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub emotions: Vec<String>,
    /// `None` only for rows written by older tooling; the service itself
    /// never stores a dream before its interpretation exists.
    pub interpretation: Option<String>,
    pub symbols: Vec<Symbol>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to insert a fully analyzed dream.
#[derive(Debug, Clone)]
pub struct NewDream {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub emotions: Vec<String>,
    pub interpretation: String,
    pub symbols: Vec<Symbol>,
}
