//! Config command - write a starter threadsmith.toml

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => {
            let replaced = write_starter_config(&path, force)?;
            print_next_steps(&path, replaced);
            Ok(())
        }
    }
}

/// Write the commented starter config, returning whether a file was replaced
///
/// An existing file is only replaced with `force`.
fn write_starter_config(path: &Path, force: bool) -> Result<bool> {
    let replaced = path.exists();
    if replaced && !force {
        bail!(
            "{} already exists; threadsmith leaves it untouched unless you pass --force",
            path.display()
        );
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
    }

    fs::write(path, AppConfig::example_toml())
        .with_context(|| format!("Cannot write starter config to {}", path.display()))?;

    if replaced {
        tracing::warn!(path = %path.display(), "Replaced existing config with the starter template");
    }
    Ok(replaced)
}

fn print_next_steps(path: &Path, replaced: bool) {
    let verb = if replaced { "Replaced" } else { "Wrote" };
    println!("{} starter config at {}", verb, path.display());
    println!("Posting stays in dry-run mode until [general] dry_run = false.");
    println!();
    println!("Before the first thread:");
    println!("  - export the key named by research.<provider>.api_key_env (GEMINI_API_KEY by default)");
    println!("  - export the X user token named by x.user_token_env to post for real");
    println!("  - threadsmith doctor            checks both, plus the history file");
    println!("  - threadsmith run --topic \"...\" --dry-run   previews a whole thread");
}
