//! History command - inspect recorded threads

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use threadsmith_adapters::history::{JsonlHistoryStore, SqliteHistoryStore};
use threadsmith_domain::{HistoryEntry, HistoryStore};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::args::{HistoryArgs, HistoryCommands};
use crate::config::AppConfig;

pub async fn execute(args: HistoryArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = build_history_store(&config).await?;

    match args.command {
        HistoryCommands::List { json } => list(&*store, json).await,
        HistoryCommands::Show { thread_id, json } => show(&*store, thread_id, json).await,
    }
}

pub(crate) async fn build_history_store(config: &AppConfig) -> Result<Box<dyn HistoryStore>> {
    let path = &config.general.history_path;

    match config.general.history_backend.as_str() {
        "jsonl" => Ok(Box::new(JsonlHistoryStore::new(path))),
        "sqlite" => Ok(Box::new(
            SqliteHistoryStore::new(path)
                .await
                .with_context(|| format!("Failed to open history database: {}", path.display()))?,
        )),
        other => bail!("Unknown history backend: {}", other),
    }
}

async fn list(store: &dyn HistoryStore, json: bool) -> Result<()> {
    let entries = store.list().await.context("Failed to read history")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No threads recorded yet.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  {}  {:<8}  {} posts  {}",
            format_time(entry),
            entry.thread_id,
            entry.status.as_str(),
            entry.posts.len(),
            entry.topic
        );
    }

    Ok(())
}

async fn show(store: &dyn HistoryStore, thread_id: Uuid, json: bool) -> Result<()> {
    let entries: Vec<HistoryEntry> = store
        .list()
        .await
        .context("Failed to read history")?
        .into_iter()
        .filter(|e| e.thread_id == thread_id)
        .collect();

    if entries.is_empty() {
        bail!("No history entries for thread {}", thread_id);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        println!("{} [{}] {}", format_time(entry), entry.status.as_str(), entry.topic);
        if let Some(ref error) = entry.error {
            println!("  Error: {}", error);
        }
        for (i, post) in entry.posts.iter().enumerate() {
            let record = entry.records.get(i);
            let marker = match record {
                Some(r) => r.url.clone().unwrap_or_else(|| r.id.clone()),
                None => "-".to_string(),
            };
            println!("  [{}] {}", i + 1, marker);
            println!("      {}", post);
        }
        println!();
    }

    Ok(())
}

fn format_time(entry: &HistoryEntry) -> String {
    entry
        .recorded_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| entry.recorded_at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_history_store_backends() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();

        config.general.history_path = dir.path().join("history.jsonl");
        let jsonl = build_history_store(&config).await.unwrap();
        assert!(jsonl.list().await.unwrap().is_empty());

        config.general.history_backend = "sqlite".to_string();
        config.general.history_path = dir.path().join("history.db");
        let sqlite = build_history_store(&config).await.unwrap();
        assert!(sqlite.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_history_backend() {
        let mut config = AppConfig::default();
        config.general.history_backend = "csv".to_string();

        let error = build_history_store(&config).await.err().unwrap();
        assert!(error.to_string().contains("Unknown history backend"));
    }
}
