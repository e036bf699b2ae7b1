//! Persisted conversation history using SQLite
//!
//! The history lives in a single key-value slot: one row holding the whole
//! serialized transcript. Every save replaces the row in one statement, so a
//! reader never sees a partially written history.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::conversation::{Message, Transcript};

use super::session::SessionError;

/// Storage key for the serialized transcript
pub const HISTORY_KEY: &str = "conversationHistory";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable slot holding the transcript across sessions
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the stored transcript. Missing or unreadable data yields an
    /// empty transcript.
    async fn load(&self) -> Transcript;

    /// Overwrite the stored transcript
    async fn save(&self, transcript: &[Message]) -> Result<(), StoreError>;

    /// Remove the stored transcript entirely
    async fn clear(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn load(&self) -> Transcript {
        (**self).load().await
    }

    async fn save(&self, transcript: &[Message]) -> Result<(), StoreError> {
        (**self).save(transcript).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }
}

/// SQLite-backed history store
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    key: String,
}

impl SqliteHistoryStore {
    /// Open (or create) a store at the given SQLite database path
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            key: HISTORY_KEY.to_string(),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory store
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self, StoreError> {
        // A single connection, otherwise each pooled connection sees its own
        // empty in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self {
            pool,
            key: HISTORY_KEY.to_string(),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Raw stored value, if any
    async fn read_raw(&self) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    #[cfg(test)]
    async fn write_raw(&self, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&self.key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn load(&self) -> Transcript {
        let raw = match self.read_raw().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored history, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Transcript>(&raw) {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!(
                    error = %SessionError::StorageCorrupt,
                    cause = %e,
                    "starting with an empty history"
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, transcript: &[Message]) -> Result<(), StoreError> {
        let value = serde_json::to_string(transcript)?;

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&self.key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(&self.key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_loads_empty() {
        let store = SqliteHistoryStore::new_in_memory().await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = SqliteHistoryStore::new_in_memory().await.unwrap();

        let transcript = vec![Message::user("hola"), Message::ai("hola!")];
        store.save(&transcript).await.unwrap();
        assert_eq!(store.load().await, transcript);

        // Saving again overwrites rather than appends
        let longer = vec![
            Message::user("hola"),
            Message::ai("hola!"),
            Message::user("¿cómo estás?"),
        ];
        store.save(&longer).await.unwrap();
        assert_eq!(store.load().await, longer);
    }

    #[tokio::test]
    async fn test_stored_format_is_json_array() {
        let store = SqliteHistoryStore::new_in_memory().await.unwrap();
        store.save(&[Message::user("hola")]).await.unwrap();

        let raw = store.read_raw().await.unwrap().unwrap();
        assert_eq!(raw, r#"[{"sender":"user","text":"hola"}]"#);
    }

    #[tokio::test]
    async fn test_corrupt_data_degrades_to_empty() {
        let store = SqliteHistoryStore::new_in_memory().await.unwrap();

        for raw in ["not json", "{\"sender\":\"user\"}", "[{\"sender\":\"robot\",\"text\":\"x\"}]"] {
            store.write_raw(raw).await.unwrap();
            assert!(store.load().await.is_empty(), "raw: {raw}");
        }
    }

    #[tokio::test]
    async fn test_corrupt_data_reported_as_storage_corrupt() {
        let store = SqliteHistoryStore::new_in_memory().await.unwrap();
        store.write_raw("[{\"sender\":\"user\"").await.unwrap();

        assert!(store.load().await.is_empty());
        assert_eq!(
            SessionError::StorageCorrupt.to_string(),
            "Stored history is corrupt"
        );

        // The corrupt value is replaced by the next save
        store.save(&[Message::user("hola")]).await.unwrap();
        assert_eq!(store.load().await, vec![Message::user("hola")]);
    }

    #[tokio::test]
    async fn test_clear_removes_slot() {
        let store = SqliteHistoryStore::new_in_memory().await.unwrap();
        store.save(&[Message::user("hola")]).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.read_raw().await.unwrap().is_none());
        assert!(store.load().await.is_empty());

        // Clearing an already empty slot is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("charla.db");

        {
            let store = SqliteHistoryStore::new(&path).await.unwrap();
            store.save(&[Message::user("hola"), Message::ai("hey")]).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteHistoryStore::new(&path).await.unwrap();
        assert_eq!(
            reopened.load().await,
            vec![Message::user("hola"), Message::ai("hey")]
        );
    }
}
