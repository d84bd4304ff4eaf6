use crate::entities::ChatMessage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ChatRequest {
    /// Redundant with the path; when present it must match it.
    #[serde(default)]
    pub dream_id: Option<i64>,
    #[validate(length(min = 1, max = 4000, message = "must be 1-4000 characters"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageResponse {
    pub id: i64,
    pub dream_id: i64,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl ChatMessage {
    pub fn to_response(&self) -> ChatMessageResponse {
        ChatMessageResponse {
            id: self.id,
            dream_id: self.dream_id,
            role: self.role.to_string(),
            content: self.content.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
