//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ErrorKind, ValidationError};
use crate::model::{HistoryEntry, MediaAttachment, ResearchReport, ResearchRequest};

/// Error type for research provider operations
#[derive(Debug, Clone, Error)]
pub enum ResearchError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<Duration>),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout")]
    Timeout,
    /// The provider answered with a 5xx status
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("API error: {0}")]
    Api(String),
}

impl ResearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResearchError::Auth(_) => ErrorKind::Authentication,
            ResearchError::RateLimited(_) => ErrorKind::RateLimit,
            ResearchError::Network(_)
            | ResearchError::Timeout
            | ResearchError::Unavailable(_) => ErrorKind::Network,
            ResearchError::InvalidFormat(_) | ResearchError::Api(_) => ErrorKind::Other,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ResearchError::RateLimited(after) => *after,
            _ => None,
        }
    }
}

/// Port for the remote research/generation service
#[async_trait]
pub trait Researcher: Send + Sync {
    /// Research a topic and return structured findings
    async fn research(&self, request: &ResearchRequest) -> Result<ResearchReport, ResearchError>;

    /// Ask the provider to write the thread posts from a report
    async fn compose(
        &self,
        report: &ResearchReport,
        request: &ResearchRequest,
    ) -> Result<Vec<String>, ResearchError>;

    /// Provider name (e.g., "gemini", "stub")
    fn provider(&self) -> &'static str;
}

/// Error type for posting operations
#[derive(Debug, Clone, Error)]
pub enum PostError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<Duration>),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rejected by platform: {0}")]
    Rejected(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("Invalid thread: {0}")]
    Validation(#[from] ValidationError),
    #[error("API error: {0}")]
    Api(String),
}

impl PostError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PostError::Auth(_) => ErrorKind::Authentication,
            PostError::RateLimited(_) => ErrorKind::RateLimit,
            PostError::Network(_) => ErrorKind::Network,
            PostError::Rejected(_) => ErrorKind::PlatformRejection,
            PostError::ContentTooLong { .. } | PostError::Validation(_) => ErrorKind::Validation,
            PostError::Api(_) => ErrorKind::Other,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PostError::RateLimited(after) => *after,
            _ => None,
        }
    }
}

/// A single post to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub text: String,
    /// Identifier of the post this one replies to
    pub reply_to: Option<String>,
    pub media_ids: Vec<String>,
}

/// Result of a successful post
#[derive(Debug, Clone)]
pub struct PublishedPost {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published post, if available
    pub url: Option<String>,
}

/// Account the poster is authenticated as
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub id: String,
    pub username: String,
}

/// Port for the social platform that receives the reply chain
#[async_trait]
pub trait ThreadPoster: Send + Sync {
    /// Create one post, optionally as a reply
    async fn post(&self, request: &PostRequest) -> Result<PublishedPost, PostError>;

    /// Upload a media file, returning the platform media ID
    async fn upload_media(&self, media: &MediaAttachment) -> Result<String, PostError>;

    /// Check the credentials against the platform
    async fn verify_credentials(&self) -> Result<AccountInfo, PostError>;

    /// Get the platform name (e.g., "x")
    fn platform(&self) -> &'static str;
}

/// Error type for history store operations
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the append-only thread history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append an entry
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError>;

    /// All entries in append order
    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Most recent entry for a thread
    async fn latest(&self, thread_id: Uuid) -> Result<Option<HistoryEntry>, HistoryError> {
        let entries = self.list().await?;
        Ok(entries.into_iter().rev().find(|e| e.thread_id == thread_id))
    }

    /// Most recent entry carrying the given fingerprint that reached the platform
    async fn find_posted(&self, fingerprint: &str) -> Result<Option<HistoryEntry>, HistoryError> {
        let entries = self.list().await?;
        Ok(entries
            .into_iter()
            .rev()
            .find(|e| e.fingerprint == fingerprint && !e.records.is_empty()))
    }
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[async_trait]
impl<R: Researcher + ?Sized> Researcher for &R {
    async fn research(&self, request: &ResearchRequest) -> Result<ResearchReport, ResearchError> {
        (**self).research(request).await
    }

    async fn compose(
        &self,
        report: &ResearchReport,
        request: &ResearchRequest,
    ) -> Result<Vec<String>, ResearchError> {
        (**self).compose(report, request).await
    }

    fn provider(&self) -> &'static str {
        (**self).provider()
    }
}

#[async_trait]
impl<P: ThreadPoster + ?Sized> ThreadPoster for &P {
    async fn post(&self, request: &PostRequest) -> Result<PublishedPost, PostError> {
        (**self).post(request).await
    }

    async fn upload_media(&self, media: &MediaAttachment) -> Result<String, PostError> {
        (**self).upload_media(media).await
    }

    async fn verify_credentials(&self) -> Result<AccountInfo, PostError> {
        (**self).verify_credentials().await
    }

    fn platform(&self) -> &'static str {
        (**self).platform()
    }
}
