//! threadsmith domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `splitter`: Breaking long text into numbered, length-limited posts
//! - `usecases`: Application use cases / business logic
//! - `error`: Error taxonomy shared by the ports

pub mod error;
pub mod model;
pub mod ports;
pub mod splitter;
pub mod usecases;

pub use error::{ErrorKind, ValidationError};
pub use model::*;
pub use ports::*;
pub use splitter::{SplitConfig, SplitError, Splitter, format_hashtags, split_text};
