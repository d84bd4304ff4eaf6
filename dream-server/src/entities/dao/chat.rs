use chrono::{DateTime, Utc};

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single row in the `chat_messages` table.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i64,
    pub dream_id: i64,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
