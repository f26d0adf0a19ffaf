//! Research provider adapters
//!
//! Every HTTP provider implements [`CompletionBackend`]; [`LlmResearcher`]
//! turns a backend into a domain [`Researcher`] by building the prompts,
//! parsing the JSON replies and retrying transient failures.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod openai_compat;
pub mod stub;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use openai_compat::OpenAiCompatBackend;
pub use stub::StubResearcher;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadsmith_domain::{
    ResearchDepth, ResearchError, ResearchReport, ResearchRequest, Researcher,
};

const RESEARCH_SYSTEM: &str =
    "You are a careful research assistant. Output only valid JSON, no commentary.";
const COMPOSE_SYSTEM: &str =
    "You write clear, engaging social media threads. Output only a JSON array of strings.";

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Temperature (0.0-1.0)
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on transient failure
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout_secs: 60,
            retries: 2,
        }
    }
}

/// A model endpoint that answers one prompt with text
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ResearchError>;

    /// Provider name (e.g., "gemini")
    fn provider(&self) -> &'static str;
}

/// [`Researcher`] backed by a completion model
pub struct LlmResearcher<B> {
    backend: B,
    retries: u32,
    max_chars: usize,
}

impl<B: CompletionBackend> LlmResearcher<B> {
    pub fn new(backend: B, retries: u32) -> Self {
        Self {
            backend,
            retries,
            max_chars: 280,
        }
    }

    /// Post length limit quoted to the model when composing
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    async fn complete_with_retries<T>(
        &self,
        system: &str,
        prompt: &str,
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, ResearchError> {
        let mut last_error = None;
        for attempt in 0..=self.retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    provider = self.backend.provider(),
                    "Retrying research call"
                );
                tokio::time::sleep(backoff(attempt)).await;
            }

            match self.backend.complete(system, prompt).await {
                Ok(text) => match parse(&text) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to parse response");
                        last_error = Some(ResearchError::InvalidFormat(e));
                    }
                },
                Err(
                    e @ (ResearchError::Network(_)
                    | ResearchError::Timeout
                    | ResearchError::Unavailable(_)
                    | ResearchError::InvalidFormat(_)),
                ) => {
                    tracing::debug!(error = %e, "Research call failed");
                    last_error = Some(e);
                }
                // Rate limits are left to the caller's retry policy
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ResearchError::Api("Unknown error".to_string())))
    }
}

#[async_trait]
impl<B: CompletionBackend> Researcher for LlmResearcher<B> {
    async fn research(&self, request: &ResearchRequest) -> Result<ResearchReport, ResearchError> {
        let prompt = build_research_prompt(request);
        self.complete_with_retries(RESEARCH_SYSTEM, &prompt, parse_research_response)
            .await
    }

    async fn compose(
        &self,
        report: &ResearchReport,
        request: &ResearchRequest,
    ) -> Result<Vec<String>, ResearchError> {
        let prompt = build_compose_prompt(report, request, self.max_chars);
        self.complete_with_retries(COMPOSE_SYSTEM, &prompt, parse_compose_response)
            .await
    }

    fn provider(&self) -> &'static str {
        self.backend.provider()
    }
}

/// Delay before retry `attempt` (1-based): one second, doubling, capped
fn backoff(attempt: u32) -> Duration {
    let millis = 500_u64.saturating_mul(2_u64.saturating_pow(attempt));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

/// Build the research prompt
pub fn build_research_prompt(request: &ResearchRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("Research the following topic: {}\n\n", request.topic));

    match request.depth {
        ResearchDepth::Quick => prompt.push_str(
            "Keep it brief: a short analysis of one or two paragraphs and three key findings.\n",
        ),
        ResearchDepth::Comprehensive => prompt.push_str(
            "Be thorough: a detailed analysis, five to eight key findings and insights, \
             and citations for all sources used.\n",
        ),
    }

    if let Some(posts) = request.style.target_posts.filter(|n| *n > 0) {
        prompt.push_str(&format!(
            "The result becomes a thread of about {} short posts, so keep the analysis \
             and findings together short enough for that.\n",
            posts
        ));
    }
    if let Some(tone) = &request.style.tone {
        prompt.push_str(&format!("Write in a {} tone.\n", tone));
    }

    prompt.push_str(
        r#"
## Output Format
Respond with ONLY a JSON object matching this exact schema:
{
  "analysis": "detailed analysis here",
  "key_findings": ["finding 1", "finding 2"],
  "citations": ["source 1", "source 2"]
}
"#,
    );

    prompt
}

/// Build the prompt asking the model to write the thread itself
pub fn build_compose_prompt(
    report: &ResearchReport,
    request: &ResearchRequest,
    max_chars: usize,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Convert this research on \"{}\" into an engaging thread.\n",
        request.topic
    ));
    prompt.push_str(&format!(
        "Each post must be under {} characters and flow naturally into the next.\n",
        max_chars
    ));
    prompt.push_str("Make it informative yet conversational. Do not number the posts.\n");

    if let Some(posts) = request.style.target_posts {
        prompt.push_str(&format!("Write about {} posts.\n", posts));
    }
    if let Some(tone) = &request.style.tone {
        prompt.push_str(&format!("Use a {} tone.\n", tone));
    }
    if !request.style.hashtags.is_empty() {
        prompt.push_str("Do not add hashtags; they are appended separately.\n");
    }

    prompt.push_str("\n## Research\n");
    prompt.push_str(&report.to_text());
    if !report.citations.is_empty() {
        prompt.push_str("\n\nSources:\n");
        for citation in &report.citations {
            prompt.push_str(&format!("- {}\n", citation));
        }
    }

    prompt.push_str("\n\n## Output Format\nReturn ONLY a JSON array of post texts, nothing else.\n");

    prompt
}

/// Parse a research response JSON
pub fn parse_research_response(response: &str) -> Result<ResearchReport, String> {
    let json_str = extract_json(response);

    let report: ResearchReport =
        serde_json::from_str(json_str).map_err(|e| format!("Failed to parse JSON: {}", e))?;

    if report.is_empty() {
        return Err("Research response has no analysis or findings".to_string());
    }
    Ok(report)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ComposedPosts {
    List(Vec<String>),
    Wrapped { posts: Vec<String> },
}

/// Parse a compose response: a JSON array of strings, or `{"posts": [...]}`
pub fn parse_compose_response(response: &str) -> Result<Vec<String>, String> {
    let json_str = extract_json(response);

    let posts = match serde_json::from_str(json_str)
        .map_err(|e| format!("Failed to parse JSON: {}", e))?
    {
        ComposedPosts::List(posts) | ComposedPosts::Wrapped { posts } => posts,
    };

    let posts: Vec<String> = posts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if posts.is_empty() {
        return Err("Compose response has no posts".to_string());
    }
    Ok(posts)
}

/// Extract JSON from response (handles markdown code blocks)
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Check for ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    // Check for ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with(['{', '[']) {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    // Assume raw JSON
    trimmed
}

/// Map a transport error from `reqwest`
pub(crate) fn send_error(e: reqwest::Error) -> ResearchError {
    if e.is_timeout() {
        ResearchError::Timeout
    } else {
        ResearchError::Network(e.to_string())
    }
}

/// Map a non-success status to the research error taxonomy
pub(crate) async fn check_status(response: Response) -> Result<Response, ResearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(ResearchError::RateLimited(retry_after(&response))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(ResearchError::Auth(format!("{}: {}", status, body)))
        }
        _ if status.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            Err(ResearchError::Unavailable(format!("{}: {}", status, body)))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ResearchError::Api(format!(
                "API returned {}: {}",
                status, body
            )))
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
