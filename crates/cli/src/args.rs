//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// threadsmith: research a topic and post it as a thread
#[derive(Parser, Debug)]
#[command(name = "threadsmith")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and write a draft thread
    Generate(GenerateArgs),

    /// Split text into posts locally, without any API calls
    Split(SplitArgs),

    /// Post a draft thread as a reply chain
    Post(PostArgs),

    /// Generate and post in one step
    Run(RunArgs),

    /// Inspect the thread history
    History(HistoryArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

/// Options shared by `generate` and `run`
#[derive(Args, Debug, Clone)]
pub struct TopicArgs {
    /// Topic to research
    #[arg(long)]
    pub topic: String,

    /// Research depth (quick, comprehensive)
    #[arg(long)]
    pub depth: Option<String>,

    /// Tone hint for the writing
    #[arg(long)]
    pub tone: Option<String>,

    /// Desired number of posts
    #[arg(long = "posts")]
    pub target_posts: Option<usize>,

    /// Hashtag to append to the final post (repeatable)
    #[arg(long = "hashtag")]
    pub hashtags: Vec<String>,

    /// Append "i/n" position markers
    #[arg(long)]
    pub numbering: bool,

    /// Thread mode (split, compose)
    #[arg(long)]
    pub mode: Option<String>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub topic: TopicArgs,

    /// Write the draft JSON to this file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Text to split
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,

    /// File containing text to split (use - for stdin)
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Override the per-post character limit
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Append "i/n" position markers
    #[arg(long)]
    pub numbering: bool,

    /// Hashtag to append to the final post (repeatable)
    #[arg(long = "hashtag")]
    pub hashtags: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Draft JSON file written by `generate --out`
    #[arg(long, conflicts_with = "thread_id", required_unless_present = "thread_id")]
    pub draft: Option<PathBuf>,

    /// Thread ID from the history
    #[arg(long)]
    pub thread_id: Option<Uuid>,

    /// Media file for the post at the same position (repeatable)
    #[arg(long)]
    pub media: Vec<PathBuf>,

    /// Log instead of posting
    #[arg(long)]
    pub dry_run: bool,

    /// Post even if an identical thread was already posted
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub topic: TopicArgs,

    /// Media file for the post at the same position (repeatable)
    #[arg(long)]
    pub media: Vec<PathBuf>,

    /// Log instead of posting
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List recorded threads
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every entry for one thread
    Show {
        /// Thread ID
        thread_id: Uuid,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./threadsmith.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Check specific component (research, x, history)
    #[arg(long)]
    pub check: Option<String>,

    /// Call the platform to verify credentials
    #[arg(long)]
    pub online: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
