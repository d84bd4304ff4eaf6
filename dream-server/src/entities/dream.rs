use crate::entities::{decode_timestamp, encode_timestamp, stored_now, Dream, NewDream, SqliteStore, Symbol};
use std::future::Future;

pub trait DreamStore: Send + Sync + 'static {
    fn insert_dream(&self, dream: NewDream)
        -> impl Future<Output = Result<Dream, sqlx::Error>> + Send;
    /// Every dream owned by `user_id`, newest first.
    fn list_dreams_by_owner(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Dream>, sqlx::Error>> + Send;
    fn get_dream_for_owner(
        &self,
        user_id: &str,
        id: i64,
    ) -> impl Future<Output = Result<Option<Dream>, sqlx::Error>> + Send;
    fn get_dream(&self, id: i64) -> impl Future<Output = Result<Option<Dream>, sqlx::Error>> + Send;
    /// Remove a dream together with its chat thread. Returns `false` when no
    /// dream with that id existed.
    fn delete_dream(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

type DreamRow = (i64, String, String, String, String, Option<String>, String, String);

const DREAM_COLUMNS: &str =
    "id, user_id, title, description, emotions, interpretation, symbols, created_at";

impl DreamStore for SqliteStore {
    async fn insert_dream(&self, dream: NewDream) -> Result<Dream, sqlx::Error> {
        let created_at = stored_now();
        let emotions = serde_json::to_string(&dream.emotions)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let symbols = serde_json::to_string(&dream.symbols)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let result = sqlx::query(
            "INSERT INTO dreams (user_id, title, description, emotions, interpretation, symbols, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&dream.user_id)
        .bind(&dream.title)
        .bind(&dream.description)
        .bind(&emotions)
        .bind(&dream.interpretation)
        .bind(&symbols)
        .bind(encode_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        Ok(Dream {
            id: result.last_insert_rowid(),
            user_id: dream.user_id,
            title: dream.title,
            description: dream.description,
            emotions: dream.emotions,
            interpretation: Some(dream.interpretation),
            symbols: dream.symbols,
            created_at,
        })
    }

    async fn list_dreams_by_owner(&self, user_id: &str) -> Result<Vec<Dream>, sqlx::Error> {
        let rows: Vec<DreamRow> = sqlx::query_as(&format!(
            "SELECT {DREAM_COLUMNS} FROM dreams WHERE user_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(dream_from_row).collect())
    }

    async fn get_dream_for_owner(&self, user_id: &str, id: i64) -> Result<Option<Dream>, sqlx::Error> {
        let row: Option<DreamRow> = sqlx::query_as(&format!(
            "SELECT {DREAM_COLUMNS} FROM dreams WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(dream_from_row))
    }

    async fn get_dream(&self, id: i64) -> Result<Option<Dream>, sqlx::Error> {
        let row: Option<DreamRow> =
            sqlx::query_as(&format!("SELECT {DREAM_COLUMNS} FROM dreams WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(dream_from_row))
    }

    async fn delete_dream(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        // Children first; works whether or not `foreign_keys` is on.
        sqlx::query("DELETE FROM chat_messages WHERE dream_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM dreams WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

fn dream_from_row(
    (id, user_id, title, description, emotions, interpretation, symbols, created_at): DreamRow,
) -> Dream {
    let emotions: Vec<String> = serde_json::from_str(&emotions).unwrap_or_else(|e| {
        tracing::warn!(dream_id = id, error = %e, "failed to parse stored emotions; using []");
        Vec::new()
    });
    let symbols: Vec<Symbol> = serde_json::from_str(&symbols).unwrap_or_else(|e| {
        tracing::warn!(dream_id = id, error = %e, "failed to parse stored symbols; using []");
        Vec::new()
    });
    Dream {
        id,
        user_id,
        title,
        description,
        emotions,
        interpretation,
        symbols,
        created_at: decode_timestamp(&created_at, "dreams.created_at"),
    }
}
