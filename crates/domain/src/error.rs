//! Shared error taxonomy

use thiserror::Error;

/// Coarse error classes shared by research and posting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    Network,
    Validation,
    PlatformRejection,
    Other,
}

impl ErrorKind {
    /// Rate limits and network failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimit | ErrorKind::Network)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::PlatformRejection => "platform_rejection",
            ErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid input or a thread that breaks platform constraints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Topic must not be empty")]
    EmptyTopic,
    #[error("Thread has no posts")]
    EmptyThread,
    #[error("Post {index} is blank")]
    BlankPost { index: usize },
    #[error("Post {index} is {len} characters, limit is {max}")]
    PostTooLong { index: usize, len: usize, max: usize },
    #[error("Invalid {name}: {value}")]
    InvalidOption { name: &'static str, value: String },
    #[error("{media} media files for a thread of {posts} posts")]
    TooManyMedia { media: usize, posts: usize },
}
