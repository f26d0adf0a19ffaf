//! Domain models and value objects

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ValidationError;

/// Character length as the platforms count it (Unicode scalar values)
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// How deep the research pass should go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    /// A short overview with a handful of findings
    Quick,
    /// A detailed analysis with citations
    #[default]
    Comprehensive,
}

impl ResearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchDepth::Quick => "quick",
            ResearchDepth::Comprehensive => "comprehensive",
        }
    }
}

impl std::str::FromStr for ResearchDepth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "quick" => Ok(ResearchDepth::Quick),
            "comprehensive" => Ok(ResearchDepth::Comprehensive),
            other => Err(ValidationError::InvalidOption {
                name: "research depth",
                value: other.to_string(),
            }),
        }
    }
}

/// How post bodies are produced from research
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThreadMode {
    /// Split the research text locally
    #[default]
    Split,
    /// Let the research provider write the posts, then normalise them
    Compose,
}

impl std::str::FromStr for ThreadMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "split" => Ok(ThreadMode::Split),
            "compose" => Ok(ThreadMode::Compose),
            other => Err(ValidationError::InvalidOption {
                name: "thread mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Optional style parameters for a thread
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadStyle {
    /// Free-form tone hint ("conversational", "technical", ...)
    #[serde(default)]
    pub tone: Option<String>,
    /// Desired number of posts
    #[serde(default)]
    pub target_posts: Option<usize>,
    /// Hashtags appended to the final post
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Append "i/n" position markers
    #[serde(default)]
    pub numbering: bool,
}

/// A research request for a topic
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub topic: String,
    pub depth: ResearchDepth,
    pub style: ThreadStyle,
}

impl ResearchRequest {
    /// Build a request, rejecting a blank topic
    pub fn new(
        topic: impl Into<String>,
        depth: ResearchDepth,
        style: ThreadStyle,
    ) -> Result<Self, ValidationError> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        Ok(Self {
            topic,
            depth,
            style,
        })
    }
}

/// Structured research returned by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    /// Prose analysis of the topic
    pub analysis: String,
    /// Key findings, one statement each
    #[serde(default)]
    pub key_findings: Vec<String>,
    /// Sources cited by the provider
    #[serde(default)]
    pub citations: Vec<String>,
}

impl ResearchReport {
    /// Raw text handed to the splitter: the analysis, then one paragraph per finding
    pub fn to_text(&self) -> String {
        let mut paragraphs = Vec::new();
        let analysis = self.analysis.trim();
        if !analysis.is_empty() {
            paragraphs.push(analysis.to_string());
        }
        for finding in &self.key_findings {
            let finding = finding.trim();
            if finding.is_empty() {
                continue;
            }
            if finding.ends_with(['.', '!', '?', '…']) {
                paragraphs.push(finding.to_string());
            } else {
                paragraphs.push(format!("{}.", finding));
            }
        }
        paragraphs.join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.analysis.trim().is_empty() && self.key_findings.iter().all(|f| f.trim().is_empty())
    }
}

/// An ordered, non-empty sequence of post bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub posts: Vec<String>,
}

impl Thread {
    pub fn new(posts: Vec<String>) -> Result<Self, ValidationError> {
        if posts.is_empty() {
            return Err(ValidationError::EmptyThread);
        }
        Ok(Self { posts })
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Check every body is non-blank and within the platform limit
    pub fn validate(&self, max_chars: usize) -> Result<(), ValidationError> {
        if self.posts.is_empty() {
            return Err(ValidationError::EmptyThread);
        }
        for (index, post) in self.posts.iter().enumerate() {
            if post.trim().is_empty() {
                return Err(ValidationError::BlankPost { index });
            }
            let len = char_len(post);
            if len > max_chars {
                return Err(ValidationError::PostTooLong {
                    index,
                    len,
                    max: max_chars,
                });
            }
        }
        Ok(())
    }

    /// SHA-256 over the post bodies, used to spot re-posts of the same thread
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for post in &self.posts {
            hasher.update(post.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// A generated thread awaiting review and posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDraft {
    pub id: Uuid,
    pub topic: String,
    pub thread: Thread,
    #[serde(default)]
    pub report: Option<ResearchReport>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A posted unit: its remote identifier and the post it replies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Media file to attach to a post
#[derive(Debug, Clone)]
pub struct MediaAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Lifecycle state recorded in the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Draft,
    Posted,
    Partial,
    Failed,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Draft => "draft",
            HistoryStatus::Posted => "posted",
            HistoryStatus::Partial => "partial",
            HistoryStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for HistoryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(HistoryStatus::Draft),
            "posted" => Ok(HistoryStatus::Posted),
            "partial" => Ok(HistoryStatus::Partial),
            "failed" => Ok(HistoryStatus::Failed),
            other => Err(ValidationError::InvalidOption {
                name: "history status",
                value: other.to_string(),
            }),
        }
    }
}

/// One record in the append-only thread history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry ID
    pub id: Uuid,
    /// Thread this entry belongs to (drafts and their posts share it)
    pub thread_id: Uuid,
    pub topic: String,
    pub posts: Vec<String>,
    #[serde(default)]
    pub records: Vec<PostRecord>,
    pub status: HistoryStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub fingerprint: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl HistoryEntry {
    /// Entry for a freshly generated draft
    pub fn draft(draft: &ThreadDraft, recorded_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id: draft.id,
            topic: draft.topic.clone(),
            posts: draft.thread.posts.clone(),
            records: vec![],
            status: HistoryStatus::Draft,
            error: None,
            fingerprint: draft.thread.fingerprint(),
            recorded_at,
        }
    }

    pub fn urls(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|r| r.url.as_deref())
            .collect()
    }
}
