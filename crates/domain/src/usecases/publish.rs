//! Publish use case - posts a thread as a reply chain

use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::ValidationError,
    model::{HistoryEntry, HistoryStatus, MediaAttachment, PostRecord, Thread},
    ports::{PostError, PostRequest, PublishedPost, ThreadPoster},
    usecases::retry::RetryPolicy,
};

/// Configuration for publishing
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Platform length limit, checked before anything is posted
    pub max_chars: usize,
    /// Retry applied to a single failing post (rate limits, network errors)
    pub retry: RetryPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_chars: 280,
            retry: RetryPolicy::default(),
        }
    }
}

/// The post that stopped the chain and why
#[derive(Debug)]
pub struct PublishFailure {
    /// Zero-based index of the post that failed
    pub index: usize,
    pub error: PostError,
}

/// Outcome of posting a thread: the prefix that went through and any failure
#[derive(Debug)]
pub struct PublishReport {
    pub records: Vec<PostRecord>,
    pub failure: Option<PublishFailure>,
}

impl PublishReport {
    fn failed(index: usize, error: PostError) -> Self {
        Self {
            records: vec![],
            failure: Some(PublishFailure { index, error }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Some posts went through before a failure
    pub fn is_partial(&self) -> bool {
        self.failure.is_some() && !self.records.is_empty()
    }

    pub fn status(&self) -> HistoryStatus {
        match (&self.failure, self.records.is_empty()) {
            (None, _) => HistoryStatus::Posted,
            (Some(_), false) => HistoryStatus::Partial,
            (Some(_), true) => HistoryStatus::Failed,
        }
    }

    /// History entry describing this outcome
    pub fn to_history_entry(
        &self,
        thread_id: Uuid,
        topic: &str,
        thread: &Thread,
        recorded_at: OffsetDateTime,
    ) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            thread_id,
            topic: topic.to_string(),
            posts: thread.posts.clone(),
            records: self.records.clone(),
            status: self.status(),
            error: self
                .failure
                .as_ref()
                .map(|f| format!("post {}: {}", f.index + 1, f.error)),
            fingerprint: thread.fingerprint(),
            recorded_at,
        }
    }
}

/// Use case posting a thread, first post standalone and every later post
/// as a reply to the one before it
pub struct PublishThread<P> {
    poster: P,
    config: PublishConfig,
}

impl<P: ThreadPoster> PublishThread<P> {
    pub fn new(poster: P, config: PublishConfig) -> Self {
        Self { poster, config }
    }

    /// Post the thread in order, stopping at the first unrecovered failure
    ///
    /// `media[i]` is attached to post `i`. Nothing is posted if the thread
    /// fails validation.
    pub async fn publish(&self, thread: &Thread, media: &[MediaAttachment]) -> PublishReport {
        let validated = thread.validate(self.config.max_chars).and_then(|()| {
            if media.len() > thread.len() {
                Err(ValidationError::TooManyMedia {
                    media: media.len(),
                    posts: thread.len(),
                })
            } else {
                Ok(())
            }
        });
        if let Err(error) = validated {
            let index = match &error {
                ValidationError::BlankPost { index } | ValidationError::PostTooLong { index, .. } => {
                    *index
                }
                _ => 0,
            };
            tracing::error!(error = %error, "Thread failed validation, nothing posted");
            return PublishReport::failed(index, error.into());
        }

        tracing::info!(
            posts = thread.len(),
            platform = self.poster.platform(),
            "Posting thread"
        );

        let mut records: Vec<PostRecord> = Vec::with_capacity(thread.len());
        let mut parent_id: Option<String> = None;

        for (index, text) in thread.posts.iter().enumerate() {
            let media_ids = match media.get(index) {
                Some(attachment) => match self.upload(attachment, index).await {
                    Ok(id) => vec![id],
                    Err(error) => {
                        return self.abort(records, index, error);
                    }
                },
                None => vec![],
            };

            let request = PostRequest {
                text: text.clone(),
                reply_to: parent_id.clone(),
                media_ids,
            };

            match self.post(&request, index).await {
                Ok(published) => {
                    tracing::info!(
                        post_index = index,
                        post_id = %published.id,
                        parent_id = ?parent_id,
                        "Posted"
                    );
                    records.push(PostRecord {
                        id: published.id.clone(),
                        parent_id: parent_id.take(),
                        url: published.url,
                    });
                    parent_id = Some(published.id);
                }
                Err(error) => return self.abort(records, index, error),
            }
        }

        PublishReport {
            records,
            failure: None,
        }
    }

    fn abort(&self, records: Vec<PostRecord>, index: usize, error: PostError) -> PublishReport {
        tracing::error!(
            post_index = index,
            posted = records.len(),
            kind = %error.kind(),
            error = %error,
            "Thread posting aborted"
        );
        PublishReport {
            records,
            failure: Some(PublishFailure { index, error }),
        }
    }

    async fn post(&self, request: &PostRequest, index: usize) -> Result<PublishedPost, PostError> {
        let mut retry = 0;
        loop {
            match self.poster.post(request).await {
                Ok(published) => return Ok(published),
                Err(error) => {
                    retry += 1;
                    let Some(delay) = self.retry_delay(&error, retry) else {
                        return Err(error);
                    };
                    tracing::warn!(
                        post_index = index,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Post failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn upload(&self, media: &MediaAttachment, index: usize) -> Result<String, PostError> {
        let mut retry = 0;
        loop {
            match self.poster.upload_media(media).await {
                Ok(id) => {
                    tracing::debug!(post_index = index, media_id = %id, "Uploaded media");
                    return Ok(id);
                }
                Err(error) => {
                    retry += 1;
                    let Some(delay) = self.retry_delay(&error, retry) else {
                        return Err(error);
                    };
                    tracing::warn!(
                        post_index = index,
                        file = %media.file_name,
                        retry,
                        error = %error,
                        "Media upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn retry_delay(&self, error: &PostError, retry: u32) -> Option<Duration> {
        if !error.kind().is_retryable() {
            return None;
        }
        self.config.retry.next_delay(retry, error.retry_after())
    }
}
