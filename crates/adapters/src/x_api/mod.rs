//! X (Twitter) API adapters

mod read;
mod write;

pub use write::XPoster;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use threadsmith_domain::{
    AccountInfo, MediaAttachment, PostError, PostRequest, PublishedPost, ThreadPoster,
};
use time::OffsetDateTime;

/// Map a non-success X API status to the posting error taxonomy
pub(crate) async fn check_status(response: Response, action: &str) -> Result<Response, PostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(PostError::Auth("Invalid user token".to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(PostError::RateLimited(rate_limit_reset(&response))),
        StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(PostError::Rejected(body))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(PostError::Api(format!("Failed to {}: {} {}", action, status, body)))
        }
    }
}

/// Time until the window in `x-rate-limit-reset` (epoch seconds) reopens
fn rate_limit_reset(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(|ts| {
            let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
            Duration::from_secs(ts.saturating_sub(now))
        })
}

/// Poster that logs instead of posting, returning synthetic identifiers
#[derive(Default)]
pub struct DryRunPoster {
    counter: AtomicU64,
    posted: Mutex<Vec<PostRequest>>,
}

impl DryRunPoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all requests that would have been posted
    pub fn get_posted(&self) -> Vec<PostRequest> {
        self.posted
            .lock()
            .map(|posted| posted.clone())
            .unwrap_or_default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ThreadPoster for DryRunPoster {
    async fn post(&self, request: &PostRequest) -> Result<PublishedPost, PostError> {
        let id = self.next_id("dry-run");
        tracing::info!(
            post_id = %id,
            reply_to = ?request.reply_to,
            media = request.media_ids.len(),
            text = %request.text,
            "Dry run: would post"
        );

        if let Ok(mut posted) = self.posted.lock() {
            posted.push(request.clone());
        }

        Ok(PublishedPost { id, url: None })
    }

    async fn upload_media(&self, media: &MediaAttachment) -> Result<String, PostError> {
        let id = self.next_id("dry-run-media");
        tracing::info!(
            media_id = %id,
            file = %media.file_name,
            bytes = media.bytes.len(),
            "Dry run: would upload media"
        );
        Ok(id)
    }

    async fn verify_credentials(&self) -> Result<AccountInfo, PostError> {
        Ok(AccountInfo {
            id: "0".to_string(),
            username: "dry-run".to_string(),
        })
    }

    fn platform(&self) -> &'static str {
        "dry-run"
    }
}
