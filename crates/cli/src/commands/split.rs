//! Split command - turn text into posts without calling any API

use anyhow::{Context, Result, bail};
use std::io::{self, Read};
use std::path::PathBuf;
use threadsmith_domain::split_text;

use crate::args::SplitArgs;
use crate::commands::generate::print_posts;
use crate::config::AppConfig;

pub async fn execute(args: SplitArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref()).unwrap_or_default();

    let text = get_input_text(&args)?;
    if text.trim().is_empty() {
        bail!("No text provided to split");
    }

    let mut split_config = config.thread.split_config();
    if let Some(max_chars) = args.max_chars {
        split_config.max_chars = max_chars;
    }
    split_config.numbering = args.numbering || split_config.numbering;
    if !args.hashtags.is_empty() {
        split_config.hashtags = args.hashtags.clone();
    }

    tracing::debug!(
        text_length = text.len(),
        max_chars = split_config.max_chars,
        "Splitting text"
    );

    let thread = split_text(&text, &split_config).context("Failed to split text")?;

    if args.json {
        let json = serde_json::to_string_pretty(&thread).context("Failed to serialize thread")?;
        println!("{}", json);
    } else {
        print_posts(&thread.posts);
    }

    Ok(())
}

fn get_input_text(args: &SplitArgs) -> Result<String> {
    if let Some(ref text) = args.text {
        return Ok(text.clone());
    }

    if let Some(ref path) = args.file {
        if path.as_os_str() != "-" {
            return std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()));
        }
    }

    // Default to stdin if no input specified
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read from stdin")?;
    Ok(text)
}
