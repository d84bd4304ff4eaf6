//! Persistence layer.
//!
//! [`DreamStore`] and [`ChatStore`] define the storage interface the HTTP
//! handlers depend on. The only implementation is [`SqliteStore`]; to move to
//! another database, implement both traits for a new type and change the
//! concrete type in [`crate::state::AppState`].
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that ordering by the text column is chronological.

pub mod chat;
pub mod dao;
pub mod dream;

pub use dao::{ChatMessage, ChatRole, Dream, NewDream, Symbol};

pub use chat::ChatStore;
pub use dream::DreamStore;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// SQLite-backed store for dreams and their chat threads.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url`.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://dreams.db?mode=rwc"`. Foreign keys are switched on for every
    /// pooled connection so chat rows cannot reference a missing dream.
    ///
    /// This does **not** touch the schema; call [`SqliteStore::migrate`]
    /// before serving traffic.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending schema migrations. Safe to run any number of times.
    ///
    /// The migration files are embedded at compile time from `./migrations`
    /// relative to `CARGO_MANIFEST_DIR`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Names of the user tables currently present, sorted.
    pub async fn table_names(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Close every pooled connection. Used at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Fresh, migrated in-memory database for tests.
    ///
    /// A single never-recycled connection keeps the in-memory database alive
    /// for the whole test.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("valid in-memory url")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("open in-memory sqlite");
        let store = Self { pool };
        store.migrate().await.expect("run migrations");
        store
    }
}

/// Current time at the precision the database keeps, so a value returned
/// from an insert equals the value read back later.
pub(crate) fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str, column: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}
