use crate::analyzer::PatternReport;
use crate::entities::{Dream, Symbol};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Longest single emotion label, in characters.
const MAX_EMOTION_CHARS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateDreamRequest {
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "must be 1-10000 characters"))]
    pub description: String,
    /// Feelings reported by the dreamer, e.g. `["joy", "fear"]`.
    #[serde(default)]
    #[validate(
        length(max = 20, message = "must list at most 20 emotions"),
        custom(function = "validate_emotions")
    )]
    pub emotions: Vec<String>,
}

fn validate_emotions(emotions: &[String]) -> Result<(), ValidationError> {
    let bad = emotions
        .iter()
        .any(|e| e.trim().is_empty() || e.chars().count() > MAX_EMOTION_CHARS);
    if bad {
        return Err(ValidationError::new("emotion_length")
            .with_message("entries must be 1-64 characters".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SymbolResponse {
    pub symbol: String,
    pub meaning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DreamResponse {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub emotions: Vec<String>,
    pub interpretation: Option<String>,
    pub symbols: Vec<SymbolResponse>,
    pub created_at: String,
}

/// Either a pattern summary or the insufficient-data notice.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PatternResponse {
    Analysis {
        pattern_analysis: String,
        dreams_analyzed: usize,
    },
    InsufficientData {
        message: String,
        dreams_count: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

impl Symbol {
    pub fn to_response(&self) -> SymbolResponse {
        SymbolResponse {
            symbol: self.symbol.clone(),
            meaning: self.meaning.clone(),
        }
    }
}

impl Dream {
    pub fn to_response(&self) -> DreamResponse {
        DreamResponse {
            id: self.id,
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            emotions: self.emotions.clone(),
            interpretation: self.interpretation.clone(),
            symbols: self.symbols.iter().map(Symbol::to_response).collect(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl From<PatternReport> for PatternResponse {
    fn from(report: PatternReport) -> Self {
        match report {
            PatternReport::Analysis {
                pattern_analysis,
                dreams_analyzed,
            } => PatternResponse::Analysis {
                pattern_analysis,
                dreams_analyzed,
            },
            PatternReport::InsufficientData {
                message,
                dreams_count,
            } => PatternResponse::InsufficientData {
                message,
                dreams_count,
            },
        }
    }
}
