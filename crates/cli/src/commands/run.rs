//! Run command - generate a thread and post it in one step

use anyhow::Result;
use std::path::PathBuf;

use crate::args::RunArgs;
use crate::commands::generate::{generate_draft, print_draft};
use crate::commands::history::build_history_store;
use crate::commands::post::{PublishJob, ensure_not_posted, load_media, publish_and_record};
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let dry_run = args.dry_run || config.general.dry_run;

    // Fail on unreadable media before spending a research call
    let media = load_media(&args.media)?;

    tracing::info!(topic = %args.topic.topic, dry_run, "Starting threadsmith run");

    let draft = generate_draft(&args.topic, &config).await?;
    if !args.json {
        print_draft(&draft);
    }

    let history = build_history_store(&config).await?;
    if !dry_run {
        ensure_not_posted(&*history, &draft.thread).await?;
    }

    publish_and_record(
        PublishJob {
            thread_id: draft.id,
            topic: &draft.topic,
            thread: &draft.thread,
            media: &media,
        },
        &config,
        &*history,
        dry_run,
        args.json,
    )
    .await?;

    tracing::info!(thread_id = %draft.id, "threadsmith run completed");
    Ok(())
}
