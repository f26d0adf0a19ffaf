//! Google Gemini API adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadsmith_domain::ResearchError;

use super::{CompletionBackend, LlmConfig, check_status, send_error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini backend, optionally grounded with Google Search
pub struct GeminiBackend {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
    search_grounding: bool,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(api_key: SecretString, base_url: String, config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            search_grounding: true,
        }
    }

    /// Enable or disable the Google Search tool
    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ResearchError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(self.config.temperature),
                max_output_tokens: Some(self.config.max_output_tokens),
            }),
            system_instruction: Some(SystemInstruction {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
            tools: if self.search_grounding {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                vec![]
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            self.config.model,
            self.api_key.expose_secret()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let response = check_status(response).await?;

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ResearchError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }

    fn provider(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmResearcher;
    use threadsmith_domain::{ResearchDepth, ResearchRequest, Researcher, ThreadStyle};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> GeminiBackend {
        GeminiBackend::with_base_url(
            SecretString::new("test-key".into()),
            server.uri(),
            LlmConfig {
                retries: 0,
                ..Default::default()
            },
        )
    }

    fn request() -> ResearchRequest {
        ResearchRequest::new("tidal energy", ResearchDepth::Comprehensive, ThreadStyle::default())
            .unwrap()
    }

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ] } }
            ]
        })
    }

    #[tokio::test]
    async fn test_research_with_search_grounding() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "tools": [ { "google_search": {} } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                "```json\n{\"analysis\": \"Tides are predictable.\", \"key_findings\": [\"Capacity is small\"], \"citations\": [\"https://example.org\"]}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let researcher = LlmResearcher::new(backend(&server), 0);
        let report = researcher.research(&request()).await.unwrap();

        assert_eq!(report.analysis, "Tides are predictable.");
        assert_eq!(report.key_findings, vec!["Capacity is small"]);
        assert_eq!(report.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_grounding_can_be_disabled() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("[\"a\"]")))
            .mount(&server)
            .await;

        let backend = backend(&server).with_search_grounding(false);
        backend.complete("system", "prompt").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let result = backend(&server).complete("system", "prompt").await;

        assert!(matches!(
            result,
            Err(ResearchError::RateLimited(Some(d))) if d == Duration::from_secs(12)
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let result = backend(&server).complete("system", "prompt").await;

        assert!(matches!(result, Err(ResearchError::Auth(_))));
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_invalid_format() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [ { "finishReason": "SAFETY" } ]
            })))
            .mount(&server)
            .await;

        let result = backend(&server).complete("system", "prompt").await;

        assert!(matches!(result, Err(ResearchError::InvalidFormat(_))));
    }
}
