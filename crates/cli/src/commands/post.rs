//! Post command - publish a draft thread as a reply chain

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};
use threadsmith_adapters::x::{DryRunPoster, XPoster};
use threadsmith_domain::usecases::{PublishConfig, PublishReport, PublishThread};
use threadsmith_domain::{
    HistoryStatus, HistoryStore, MediaAttachment, PostRecord, Thread, ThreadDraft, ThreadPoster,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::args::PostArgs;
use crate::commands::generate::load_api_key;
use crate::commands::history::build_history_store;
use crate::config::AppConfig;

pub async fn execute(args: PostArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let history = build_history_store(&config).await?;

    let (thread_id, topic, thread) = match (&args.draft, args.thread_id) {
        (Some(path), _) => {
            let draft = load_draft(path)?;
            (draft.id, draft.topic, draft.thread)
        }
        (None, Some(thread_id)) => {
            let entry = history
                .latest(thread_id)
                .await
                .context("Failed to read history")?
                .with_context(|| format!("Thread {} not found in history", thread_id))?;
            (entry.thread_id, entry.topic, Thread::new(entry.posts)?)
        }
        (None, None) => bail!("Either --draft or --thread-id is required"),
    };

    let dry_run = args.dry_run || config.general.dry_run;

    if !dry_run && !args.force {
        ensure_not_posted(&*history, &thread).await?;
    }

    let media = load_media(&args.media)?;

    publish_and_record(
        PublishJob {
            thread_id,
            topic: &topic,
            thread: &thread,
            media: &media,
        },
        &config,
        &*history,
        dry_run,
        args.json,
    )
    .await
}

/// A thread ready to be posted
pub(crate) struct PublishJob<'a> {
    pub thread_id: Uuid,
    pub topic: &'a str,
    pub thread: &'a Thread,
    pub media: &'a [MediaAttachment],
}

#[derive(Serialize)]
struct PostOutput<'a> {
    thread_id: Uuid,
    status: HistoryStatus,
    dry_run: bool,
    records: &'a [PostRecord],
    error: Option<String>,
}

/// Post the thread, record the outcome and fail when the chain broke
pub(crate) async fn publish_and_record(
    job: PublishJob<'_>,
    config: &AppConfig,
    history: &dyn HistoryStore,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let poster = build_poster(config, dry_run)?;

    tracing::info!(
        thread_id = %job.thread_id,
        posts = job.thread.len(),
        media = job.media.len(),
        platform = poster.platform(),
        dry_run,
        "Posting thread"
    );

    let usecase = PublishThread::new(
        &*poster,
        PublishConfig {
            max_chars: config.thread.max_chars,
            retry: config.x.retry_policy(),
        },
    );
    let report = usecase.publish(job.thread, job.media).await;

    // Dry runs never reached the platform, so they stay out of the duplicate check
    if dry_run {
        tracing::info!("Dry run: history not updated");
    } else {
        let entry =
            report.to_history_entry(job.thread_id, job.topic, job.thread, OffsetDateTime::now_utc());
        history
            .append(&entry)
            .await
            .context("Failed to record thread in history")?;
    }

    let output = PostOutput {
        thread_id: job.thread_id,
        status: report.status(),
        dry_run,
        records: &report.records,
        error: report
            .failure
            .as_ref()
            .map(|f| format!("post {}: {}", f.index + 1, f.error)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report, job.thread.len(), dry_run);
    }

    match &report.failure {
        None => Ok(()),
        Some(failure) if report.is_partial() => bail!(
            "Thread partially posted: {}/{} posts went through, post {} failed ({}): {}",
            report.records.len(),
            job.thread.len(),
            failure.index + 1,
            failure.error.kind(),
            failure.error
        ),
        Some(failure) => bail!(
            "Posting failed at post {} ({}): {}",
            failure.index + 1,
            failure.error.kind(),
            failure.error
        ),
    }
}

pub(crate) fn build_poster(config: &AppConfig, dry_run: bool) -> Result<Box<dyn ThreadPoster>> {
    if dry_run {
        return Ok(Box::new(DryRunPoster::new()));
    }

    let token = load_api_key(&config.x.user_token_env, "x")?;
    Ok(Box::new(XPoster::with_base_url(
        token,
        config.x.base_url.clone(),
        config.x.handle(),
        config.thread.max_chars,
    )))
}

/// Refuse to post a thread whose exact bodies already reached the platform
pub(crate) async fn ensure_not_posted(history: &dyn HistoryStore, thread: &Thread) -> Result<()> {
    let fingerprint = thread.fingerprint();
    if let Some(previous) = history
        .find_posted(&fingerprint)
        .await
        .context("Failed to read history")?
    {
        bail!(
            "This thread was already posted as {} ({}). Use --force to post it again.",
            previous.thread_id,
            previous.status.as_str()
        );
    }
    Ok(())
}

fn load_draft(path: &Path) -> Result<ThreadDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse draft: {}", path.display()))
}

pub(crate) fn load_media(paths: &[PathBuf]) -> Result<Vec<MediaAttachment>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read media file: {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "media".to_string());
            let mime_type = mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            Ok(MediaAttachment {
                file_name,
                mime_type,
                bytes,
            })
        })
        .collect()
}

fn print_report(report: &PublishReport, total: usize, dry_run: bool) {
    let prefix = if dry_run { "[dry run] " } else { "" };

    for (i, record) in report.records.iter().enumerate() {
        let location = record.url.as_deref().unwrap_or(&record.id);
        println!("{}✓ {}/{} {}", prefix, i + 1, total, location);
    }

    if let Some(ref failure) = report.failure {
        println!("{}✗ {}/{} {}", prefix, failure.index + 1, total, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use threadsmith_adapters::history::InMemoryHistoryStore;
    use threadsmith_domain::usecases::PublishFailure;
    use threadsmith_domain::{HistoryEntry, PostError};

    fn thread() -> Thread {
        Thread::new(vec!["One.".to_string(), "Two.".to_string()]).unwrap()
    }

    fn stub_config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.general.history_path = dir.path().join("history.jsonl");
        config
    }

    #[test]
    fn test_load_media_guesses_mime_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let media = load_media(&[path]).unwrap();
        assert_eq!(media[0].file_name, "chart.png");
        assert_eq!(media[0].mime_type, "image/png");
        assert_eq!(media[0].bytes.len(), 4);
    }

    #[test]
    fn test_load_media_missing_file() {
        let error = load_media(&[PathBuf::from("/nonexistent/clip.mp4")]).unwrap_err();
        assert!(error.to_string().contains("clip.mp4"));
    }

    #[test]
    fn test_build_poster_requires_token_for_live_posting() {
        let mut config = AppConfig::default();
        config.x.user_token_env = "THREADSMITH_TEST_UNSET_TOKEN".to_string();

        assert!(build_poster(&config, false).is_err());
        assert_eq!(build_poster(&config, true).unwrap().platform(), "dry-run");
    }

    #[tokio::test]
    async fn test_ensure_not_posted_blocks_duplicates() {
        let history = InMemoryHistoryStore::new();
        let thread = thread();
        assert!(ensure_not_posted(&history, &thread).await.is_ok());

        let report = PublishReport {
            records: vec![PostRecord {
                id: "100".to_string(),
                parent_id: None,
                url: None,
            }],
            failure: Some(PublishFailure {
                index: 1,
                error: PostError::RateLimited(None),
            }),
        };
        let entry: HistoryEntry =
            report.to_history_entry(Uuid::new_v4(), "Numbers", &thread, OffsetDateTime::now_utc());
        history.append(&entry).await.unwrap();

        let error = ensure_not_posted(&history, &thread).await.unwrap_err();
        assert!(error.to_string().contains("--force"));
    }

    #[tokio::test]
    async fn test_dry_run_publish_leaves_history_untouched() {
        let dir = TempDir::new().unwrap();
        let config = stub_config(&dir);
        let history = InMemoryHistoryStore::new();
        let thread = thread();

        publish_and_record(
            PublishJob {
                thread_id: Uuid::new_v4(),
                topic: "Numbers",
                thread: &thread,
                media: &[],
            },
            &config,
            &history,
            true,
            true,
        )
        .await
        .unwrap();

        assert!(history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_thread_fails_before_posting() {
        let dir = TempDir::new().unwrap();
        let mut config = stub_config(&dir);
        config.thread.max_chars = 3;
        let history = InMemoryHistoryStore::new();
        let thread = thread();

        let error = publish_and_record(
            PublishJob {
                thread_id: Uuid::new_v4(),
                topic: "Numbers",
                thread: &thread,
                media: &[],
            },
            &config,
            &history,
            true,
            true,
        )
        .await
        .unwrap_err();

        assert!(error.to_string().contains("Posting failed at post 1"));
    }
}
