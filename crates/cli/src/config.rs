//! Configuration loading and management

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use threadsmith_domain::{ResearchDepth, SplitConfig, ThreadMode, usecases::RetryPolicy};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub thread: ThreadConfig,

    #[serde(default)]
    pub x: XConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_history_backend")]
    pub history_backend: String,

    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_research_retries")]
    pub retries: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_depth")]
    pub depth: String,

    /// Retries after a rate-limit response
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,

    #[serde(default = "default_max_retry_wait_secs")]
    pub max_retry_wait_secs: u64,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub openai_compat: OpenAiCompatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_true")]
    pub search_grounding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    #[serde(default)]
    pub api_key_env: String,

    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// 0 disables the cap
    #[serde(default = "default_max_posts")]
    pub max_posts: usize,

    #[serde(default)]
    pub numbering: bool,

    #[serde(default)]
    pub hashtags: Vec<String>,

    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default = "default_x_user_token_env")]
    pub user_token_env: String,

    /// Account handle used to build post URLs
    #[serde(default)]
    pub handle: String,

    #[serde(default = "default_x_base_url")]
    pub base_url: String,

    #[serde(default = "default_x_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_x_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_max_retry_wait_secs")]
    pub max_retry_wait_secs: u64,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_history_backend() -> String {
    "jsonl".to_string()
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./data/thread_history.jsonl")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout() -> u64 {
    60
}

fn default_research_retries() -> u32 {
    2
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_depth() -> String {
    "comprehensive".to_string()
}

fn default_rate_limit_retries() -> u32 {
    1
}

fn default_max_retry_wait_secs() -> u64 {
    900
}

fn default_gemini_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_max_chars() -> usize {
    280
}

fn default_max_posts() -> usize {
    10
}

fn default_mode() -> String {
    "split".to_string()
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_x_max_retries() -> u32 {
    1
}

fn default_x_retry_base_delay_ms() -> u64 {
    2000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dry_run: default_true(),
            history_backend: default_history_backend(),
            history_path: default_history_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            retries: default_research_retries(),
            max_output_tokens: default_max_output_tokens(),
            depth: default_depth(),
            rate_limit_retries: default_rate_limit_retries(),
            max_retry_wait_secs: default_max_retry_wait_secs(),
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            ollama: OllamaConfig::default(),
            openai_compat: OpenAiCompatConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_api_key_env(),
            base_url: String::new(),
            search_grounding: default_true(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_posts: default_max_posts(),
            numbering: false,
            hashtags: vec![],
            mode: default_mode(),
            tone: None,
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            user_token_env: default_x_user_token_env(),
            handle: String::new(),
            base_url: default_x_base_url(),
            max_retries: default_x_max_retries(),
            retry_base_delay_ms: default_x_retry_base_delay_ms(),
            max_retry_wait_secs: default_max_retry_wait_secs(),
        }
    }
}

impl ResearchConfig {
    pub fn depth(&self) -> Result<ResearchDepth> {
        self.depth
            .parse()
            .with_context(|| format!("Invalid research.depth: {}", self.depth))
    }

    /// Retry applied to rate-limited research calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.rate_limit_retries,
            max_delay: Duration::from_secs(self.max_retry_wait_secs),
            ..Default::default()
        }
    }
}

impl ThreadConfig {
    pub fn mode(&self) -> Result<ThreadMode> {
        self.mode
            .parse()
            .with_context(|| format!("Invalid thread.mode: {}", self.mode))
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            max_chars: self.max_chars,
            numbering: self.numbering,
            hashtags: self.hashtags.clone(),
            max_posts: if self.max_posts == 0 {
                None
            } else {
                Some(self.max_posts)
            },
        }
    }
}

impl XConfig {
    /// Retry applied to a single failing post
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_secs(self.max_retry_wait_secs),
        }
    }

    pub fn handle(&self) -> Option<String> {
        let handle = self.handle.trim();
        if handle.is_empty() {
            None
        } else {
            Some(handle.to_string())
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./threadsmith.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("THREADSMITH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# threadsmith configuration
# API keys are read from the environment variables named below (a .env file works too).

[general]
# Log posts instead of sending them until this is set to false
dry_run = true
history_backend = "jsonl"  # jsonl, sqlite
history_path = "./data/thread_history.jsonl"
log_level = "info"

[research]
provider = "gemini"  # gemini, openai, anthropic, ollama, openai_compat, stub
model = "gemini-2.0-flash"
temperature = 0.7
timeout_secs = 60
retries = 2
max_output_tokens = 2048
depth = "comprehensive"  # quick, comprehensive
rate_limit_retries = 1
max_retry_wait_secs = 900

[research.gemini]
api_key_env = "GEMINI_API_KEY"
search_grounding = true

[research.openai]
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"

[research.anthropic]
api_key_env = "ANTHROPIC_API_KEY"

[research.ollama]
base_url = "http://localhost:11434"

[research.openai_compat]
api_key_env = "LLM_API_KEY"
base_url = "https://your-provider.com/v1"

[thread]
max_chars = 280
# 0 disables the cap
max_posts = 10
# Append "1/5" position markers
numbering = false
hashtags = []
mode = "split"  # split, compose
# tone = "conversational"

[x]
user_token_env = "X_USER_TOKEN"
# handle = "your_handle"
base_url = "https://api.twitter.com"
max_retries = 1
retry_base_delay_ms = 2000
max_retry_wait_secs = 900
"#
        .to_string()
    }
}
