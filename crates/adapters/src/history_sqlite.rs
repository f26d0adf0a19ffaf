//! SQLite history store implementation

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use threadsmith_domain::{HistoryEntry, HistoryError, HistoryStatus, HistoryStore, PostRecord};
use time::OffsetDateTime;
use uuid::Uuid;

type EntryRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
);

const SELECT_COLUMNS: &str = "SELECT id, thread_id, topic, posts, records, status, error, \
                              fingerprint, recorded_at FROM history_entries";

/// SQLite-backed append-only history
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Open the database, creating it and its schema if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HistoryError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, HistoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history_entries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                thread_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                posts TEXT NOT NULL,
                records TEXT NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                fingerprint TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_history_thread
            ON history_entries(thread_id)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }
}

fn from_row(row: EntryRow) -> Result<HistoryEntry, HistoryError> {
    let (id, thread_id, topic, posts, records, status, error, fingerprint, recorded_at) = row;

    let serialization = |e: &dyn std::fmt::Display| HistoryError::Serialization(e.to_string());

    let posts: Vec<String> = serde_json::from_str(&posts).map_err(|e| serialization(&e))?;
    let records: Vec<PostRecord> = serde_json::from_str(&records).map_err(|e| serialization(&e))?;
    let status: HistoryStatus = status.parse().map_err(|e| serialization(&e))?;
    let recorded_at =
        OffsetDateTime::parse(&recorded_at, &time::format_description::well_known::Rfc3339)
            .map_err(|e| serialization(&e))?;

    Ok(HistoryEntry {
        id: Uuid::parse_str(&id).map_err(|e| serialization(&e))?,
        thread_id: Uuid::parse_str(&thread_id).map_err(|e| serialization(&e))?,
        topic,
        posts,
        records,
        status,
        error,
        fingerprint,
        recorded_at,
    })
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let recorded_at = entry
            .recorded_at
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        let posts = serde_json::to_string(&entry.posts)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        let records = serde_json::to_string(&entry.records)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO history_entries
            (id, thread_id, topic, posts, records, status, error, fingerprint, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.thread_id.to_string())
        .bind(&entry.topic)
        .bind(&posts)
        .bind(&records)
        .bind(entry.status.as_str())
        .bind(&entry.error)
        .bind(&entry.fingerprint)
        .bind(&recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!("{} ORDER BY seq", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        rows.into_iter().map(from_row).collect()
    }

    async fn latest(&self, thread_id: Uuid) -> Result<Option<HistoryEntry>, HistoryError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "{} WHERE thread_id = ? ORDER BY seq DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(thread_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        row.map(from_row).transpose()
    }
}
