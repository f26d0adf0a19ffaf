//! threadsmith adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `llm`: Research provider adapters (Gemini, OpenAI, Anthropic, etc.)
//! - `x`: X (Twitter) API poster and the dry-run poster
//! - `history`: JSON Lines, SQLite and in-memory history stores

mod history_jsonl;
mod history_memory;
mod history_sqlite;

pub mod llm;
pub mod x_api;

/// Re-exports for history adapters
pub mod history {
    pub use crate::history_jsonl::JsonlHistoryStore;
    pub use crate::history_memory::InMemoryHistoryStore;
    pub use crate::history_sqlite::SqliteHistoryStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{DryRunPoster, XPoster};
}
