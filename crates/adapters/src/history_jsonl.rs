//! JSON Lines history store: one entry per line, append-only

use async_trait::async_trait;
use std::path::PathBuf;
use threadsmith_domain::{HistoryEntry, HistoryError, HistoryStore};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// History kept in a `.jsonl` file, created with its parent directories on first append
#[derive(Debug)]
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let mut line =
            serde_json::to_string(entry).map_err(|e| HistoryError::Serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            path = %self.path.display(),
            thread_id = %entry.thread_id,
            status = entry.status.as_str(),
            "Appended history entry"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                // An interrupted append leaves a torn last line
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = number + 1,
                    error = %e,
                    "Skipping unreadable history line"
                ),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use threadsmith_domain::{HistoryStatus, PostRecord};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn entry(thread_id: Uuid, status: HistoryStatus) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            thread_id,
            topic: "Deep sea mining".to_string(),
            posts: vec!["First.".to_string(), "Second.".to_string()],
            records: vec![],
            status,
            error: None,
            fingerprint: "abc".to_string(),
            recorded_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_lists_empty() {
        let dir = TempDir::new().expect("temp dir");
        let store = JsonlHistoryStore::new(dir.path().join("history.jsonl"));

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_directories_and_keeps_order() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested/data/history.jsonl");
        let store = JsonlHistoryStore::new(&path);
        let thread_id = Uuid::new_v4();

        store
            .append(&entry(thread_id, HistoryStatus::Draft))
            .await
            .unwrap();
        let mut posted = entry(thread_id, HistoryStatus::Posted);
        posted.records = vec![PostRecord {
            id: "1".to_string(),
            parent_id: None,
            url: Some("https://x.com/i/status/1".to_string()),
        }];
        store.append(&posted).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.expect("read history");
        assert_eq!(contents.lines().count(), 2);

        let entries = store.list().await.unwrap();
        assert_eq!(entries[0].status, HistoryStatus::Draft);
        assert_eq!(entries[1].status, HistoryStatus::Posted);

        let latest = store.latest(thread_id).await.unwrap().unwrap();
        assert_eq!(latest.urls(), vec!["https://x.com/i/status/1"]);
        assert!(store.find_posted("abc").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_torn_line_is_skipped() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("history.jsonl");
        let store = JsonlHistoryStore::new(&path);

        store
            .append(&entry(Uuid::new_v4(), HistoryStatus::Draft))
            .await
            .unwrap();
        let mut contents = tokio::fs::read_to_string(&path).await.unwrap();
        contents.push_str("{\"id\": \"trunc");
        tokio::fs::write(&path, contents).await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
