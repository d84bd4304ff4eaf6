use crate::entities::{decode_timestamp, encode_timestamp, stored_now, ChatMessage, ChatRole, SqliteStore};
use sqlx::{Executor, Sqlite};
use std::future::Future;
use std::str::FromStr;

pub trait ChatStore: Send + Sync + 'static {
    /// Persist a single message.
    fn insert_message(
        &self,
        dream_id: i64,
        role: ChatRole,
        content: &str,
    ) -> impl Future<Output = Result<ChatMessage, sqlx::Error>> + Send;
    /// Persist one question/answer pair atomically. The user row is always
    /// written before, and never timestamped after, the assistant row.
    fn append_exchange(
        &self,
        dream_id: i64,
        question: &str,
        answer: &str,
    ) -> impl Future<Output = Result<(ChatMessage, ChatMessage), sqlx::Error>> + Send;
    /// Full thread for a dream, oldest first.
    fn list_messages(
        &self,
        dream_id: i64,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;
}

async fn insert_with<'e, E>(
    executor: E,
    dream_id: i64,
    role: ChatRole,
    content: &str,
) -> Result<ChatMessage, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let created_at = stored_now();
    let result = sqlx::query(
        "INSERT INTO chat_messages (dream_id, role, content, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(dream_id)
    .bind(role.as_ref())
    .bind(content)
    .bind(encode_timestamp(&created_at))
    .execute(executor)
    .await?;

    Ok(ChatMessage {
        id: result.last_insert_rowid(),
        dream_id,
        role,
        content: content.to_owned(),
        created_at,
    })
}

impl ChatStore for SqliteStore {
    async fn insert_message(
        &self,
        dream_id: i64,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, sqlx::Error> {
        insert_with(&self.pool, dream_id, role, content).await
    }

    async fn append_exchange(
        &self,
        dream_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<(ChatMessage, ChatMessage), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let user = insert_with(&mut *tx, dream_id, ChatRole::User, question).await?;
        let assistant = insert_with(&mut *tx, dream_id, ChatRole::Assistant, answer).await?;
        tx.commit().await?;
        Ok((user, assistant))
    }

    async fn list_messages(&self, dream_id: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<(i64, i64, String, String, String)> = sqlx::query_as(
            "SELECT id, dream_id, role, content, created_at \
             FROM chat_messages WHERE dream_id = ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(dream_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, dream_id, role, content, created_at)| {
                let role = ChatRole::from_str(&role).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "role".into(),
                    source: Box::new(e),
                })?;
                Ok(ChatMessage {
                    id,
                    dream_id,
                    role,
                    content,
                    created_at: decode_timestamp(&created_at, "chat_messages.created_at"),
                })
            })
            .collect()
    }
}
