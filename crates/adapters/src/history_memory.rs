//! In-memory history store for testing and dry runs

use async_trait::async_trait;
use std::sync::RwLock;
use threadsmith_domain::{HistoryEntry, HistoryError, HistoryStore};

/// In-memory history implementation
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        entries.push(entry.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadsmith_domain::{HistoryStatus, PostRecord};
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_find_posted_ignores_drafts() {
        let store = InMemoryHistoryStore::new();
        let draft = HistoryEntry {
            id: Uuid::new_v4(),
            thread_id: Uuid::new_v4(),
            topic: "t".to_string(),
            posts: vec!["p".to_string()],
            records: vec![],
            status: HistoryStatus::Draft,
            error: None,
            fingerprint: "same".to_string(),
            recorded_at: OffsetDateTime::now_utc(),
        };
        store.append(&draft).await.unwrap();
        assert!(store.find_posted("same").await.unwrap().is_none());

        let posted = HistoryEntry {
            id: Uuid::new_v4(),
            status: HistoryStatus::Posted,
            records: vec![PostRecord {
                id: "1".to_string(),
                parent_id: None,
                url: None,
            }],
            ..draft.clone()
        };
        store.append(&posted).await.unwrap();

        let found = store.find_posted("same").await.unwrap().unwrap();
        assert_eq!(found.id, posted.id);
        assert_eq!(store.latest(draft.thread_id).await.unwrap().unwrap().id, posted.id);
    }
}
