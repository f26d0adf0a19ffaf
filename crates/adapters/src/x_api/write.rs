//! X API write adapter: posts and media uploads

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadsmith_domain::{
    AccountInfo, MediaAttachment, PostError, PostRequest, PublishedPost, ThreadPoster, char_len,
};

use super::check_status;

/// X API poster authenticated with an OAuth 2.0 user-context token
pub struct XPoster {
    pub(super) client: Client,
    pub(super) user_token: SecretString,
    pub(super) base_url: String,
    handle: Option<String>,
    max_chars: usize,
}

impl XPoster {
    pub fn new(user_token: SecretString, handle: Option<String>, max_chars: usize) -> Self {
        Self::with_base_url(
            user_token,
            "https://api.twitter.com".to_string(),
            handle,
            max_chars,
        )
    }

    pub fn with_base_url(
        user_token: SecretString,
        base_url: String,
        handle: Option<String>,
        max_chars: usize,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            handle: handle
                .map(|h| h.trim_start_matches('@').to_string())
                .filter(|h| !h.is_empty()),
            max_chars,
        }
    }

    fn post_url(&self, id: &str) -> String {
        match &self.handle {
            Some(handle) => format!("https://x.com/{}/status/{}", handle, id),
            None => format!("https://x.com/i/status/{}", id),
        }
    }

    pub(super) fn bearer(&self) -> String {
        format!("Bearer {}", self.user_token.expose_secret())
    }
}

#[derive(Serialize)]
struct CreateTweetRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaSettings>,
}

#[derive(Serialize)]
struct ReplySettings {
    in_reply_to_tweet_id: String,
}

#[derive(Serialize)]
struct MediaSettings {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    data: MediaData,
}

#[derive(Deserialize)]
struct MediaData {
    id: String,
}

fn media_category(mime_type: &str) -> &'static str {
    if mime_type == "image/gif" {
        "tweet_gif"
    } else if mime_type.starts_with("video/") {
        "tweet_video"
    } else {
        "tweet_image"
    }
}

#[async_trait]
impl ThreadPoster for XPoster {
    async fn post(&self, request: &PostRequest) -> Result<PublishedPost, PostError> {
        let len = char_len(&request.text);
        if len > self.max_chars {
            return Err(PostError::ContentTooLong {
                len,
                max: self.max_chars,
            });
        }

        let body = CreateTweetRequest {
            text: request.text.clone(),
            reply: request.reply_to.as_ref().map(|id| ReplySettings {
                in_reply_to_tweet_id: id.clone(),
            }),
            media: if request.media_ids.is_empty() {
                None
            } else {
                Some(MediaSettings {
                    media_ids: request.media_ids.clone(),
                })
            },
        };

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        let response = check_status(response, "create tweet").await?;

        let tweet_response: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PostError::Api(e.to_string()))?;

        let id = tweet_response.data.id;
        Ok(PublishedPost {
            url: Some(self.post_url(&id)),
            id,
        })
    }

    async fn upload_media(&self, media: &MediaAttachment) -> Result<String, PostError> {
        let part = Part::bytes(media.bytes.clone())
            .file_name(media.file_name.clone())
            .mime_str(&media.mime_type)
            .map_err(|e| PostError::Api(format!("Invalid media type: {}", e)))?;

        let form = Form::new()
            .text("media_category", media_category(&media.mime_type))
            .part("media", part);

        let url = format!("{}/2/media/upload", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        let response = check_status(response, "upload media").await?;

        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| PostError::Api(e.to_string()))?;

        Ok(upload.data.id)
    }

    async fn verify_credentials(&self) -> Result<AccountInfo, PostError> {
        self.fetch_me().await
    }

    fn platform(&self) -> &'static str {
        "x"
    }
}
