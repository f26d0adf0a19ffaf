//! OpenAI-compatible chat completions adapter for third-party providers

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadsmith_domain::ResearchError;

use super::{CompletionBackend, LlmConfig, check_status, send_error};

/// Backend for any `/chat/completions` endpoint (OpenRouter, Groq, vLLM, ...)
pub struct OpenAiCompatBackend {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiCompatBackend {
    pub fn new(api_key: SecretString, base_url: String, config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ResearchError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_output_tokens),
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let response = check_status(response).await?;

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ResearchError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }

    fn provider(&self) -> &'static str {
        "openai_compat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_completion_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "model": "llama-3.1-70b" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "content": "{\"analysis\": \"ok\"}" } } ]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiCompatBackend::new(
            SecretString::new("k".into()),
            format!("{}/v1/", server.uri()),
            LlmConfig {
                model: "llama-3.1-70b".to_string(),
                ..Default::default()
            },
        );

        let text = backend.complete("system", "prompt").await.unwrap();
        assert_eq!(text, "{\"analysis\": \"ok\"}");
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let backend =
            OpenAiCompatBackend::new(SecretString::new("k".into()), server.uri(), LlmConfig::default());

        assert!(matches!(
            backend.complete("system", "prompt").await,
            Err(ResearchError::Auth(_))
        ));
    }
}
