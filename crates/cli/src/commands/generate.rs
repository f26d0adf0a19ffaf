//! Generate command - research a topic and write a draft thread

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::path::PathBuf;
use threadsmith_adapters::llm::{
    AnthropicBackend, CompletionBackend, GeminiBackend, LlmConfig as AdapterLlmConfig,
    LlmResearcher, OllamaBackend, OpenAiBackend, OpenAiCompatBackend, StubResearcher,
};
use threadsmith_domain::usecases::{GenerateConfig, GenerateThread};
use threadsmith_domain::{HistoryEntry, ResearchRequest, Researcher, ThreadDraft, ThreadStyle};
use time::OffsetDateTime;

use crate::args::{GenerateArgs, TopicArgs};
use crate::commands::history::build_history_store;
use crate::config::AppConfig;

pub async fn execute(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let draft = generate_draft(&args.topic, &config).await?;

    if let Some(ref out) = args.out {
        let json = serde_json::to_string_pretty(&draft).context("Failed to serialize draft")?;
        std::fs::write(out, json)
            .with_context(|| format!("Failed to write draft: {}", out.display()))?;
        tracing::info!(path = %out.display(), "Draft written");
    }

    if args.json {
        let json = serde_json::to_string_pretty(&draft).context("Failed to serialize draft")?;
        println!("{}", json);
    } else {
        print_draft(&draft);
    }

    Ok(())
}

/// Research the topic, build the thread and record it as a draft
pub(crate) async fn generate_draft(topic: &TopicArgs, config: &AppConfig) -> Result<ThreadDraft> {
    let request = research_request(topic, config)?;
    let generate_config = generate_config(topic, config)?;

    let researcher = build_researcher(config)?;
    let usecase = GenerateThread::new(&*researcher, generate_config);
    let draft = usecase
        .generate(&request)
        .await
        .context("Thread generation failed")?;

    let history = build_history_store(config).await?;
    history
        .append(&HistoryEntry::draft(&draft, OffsetDateTime::now_utc()))
        .await
        .context("Failed to record draft in history")?;

    tracing::info!(thread_id = %draft.id, posts = draft.thread.len(), "Draft recorded");

    Ok(draft)
}

fn research_request(topic: &TopicArgs, config: &AppConfig) -> Result<ResearchRequest> {
    let depth = match topic.depth.as_deref() {
        Some(depth) => depth
            .parse()
            .with_context(|| format!("Invalid --depth: {}", depth))?,
        None => config.research.depth()?,
    };

    let style = ThreadStyle {
        tone: topic.tone.clone().or_else(|| config.thread.tone.clone()),
        target_posts: topic.target_posts,
        hashtags: hashtags(topic, config),
        numbering: topic.numbering || config.thread.numbering,
    };

    Ok(ResearchRequest::new(topic.topic.clone(), depth, style)?)
}

fn generate_config(topic: &TopicArgs, config: &AppConfig) -> Result<GenerateConfig> {
    let mode = match topic.mode.as_deref() {
        Some(mode) => mode
            .parse()
            .with_context(|| format!("Invalid --mode: {}", mode))?,
        None => config.thread.mode()?,
    };

    let mut split = config.thread.split_config();
    split.numbering = topic.numbering || split.numbering;
    split.hashtags = hashtags(topic, config);

    Ok(GenerateConfig {
        split,
        mode,
        retry: config.research.retry_policy(),
    })
}

/// Hashtags from the command line replace the configured ones
fn hashtags(topic: &TopicArgs, config: &AppConfig) -> Vec<String> {
    if topic.hashtags.is_empty() {
        config.thread.hashtags.clone()
    } else {
        topic.hashtags.clone()
    }
}

pub(crate) fn build_researcher(config: &AppConfig) -> Result<Box<dyn Researcher>> {
    let research = &config.research;
    let llm_config = adapter_llm_config(config);
    let max_chars = config.thread.max_chars;

    match research.provider.as_str() {
        "gemini" => {
            let api_key = load_api_key(&research.gemini.api_key_env, "gemini")?;
            let base_url = research.gemini.base_url.trim();
            let backend = if base_url.is_empty() {
                GeminiBackend::new(api_key, llm_config)
            } else {
                GeminiBackend::with_base_url(api_key, base_url.to_string(), llm_config)
            };
            Ok(boxed(
                backend.with_search_grounding(research.gemini.search_grounding),
                research.retries,
                max_chars,
            ))
        }
        "openai" => {
            let api_key = load_api_key(&research.openai.api_key_env, "openai")?;
            Ok(boxed(
                OpenAiBackend::with_base_url(api_key, research.openai.base_url.clone(), llm_config),
                research.retries,
                max_chars,
            ))
        }
        "anthropic" => {
            let api_key = load_api_key(&research.anthropic.api_key_env, "anthropic")?;
            Ok(boxed(
                AnthropicBackend::new(api_key, llm_config),
                research.retries,
                max_chars,
            ))
        }
        "ollama" => {
            let base_url = research.ollama.base_url.trim();
            let backend = if base_url.is_empty() {
                OllamaBackend::new(llm_config)
            } else {
                OllamaBackend::with_base_url(base_url.to_string(), llm_config)
            };
            Ok(boxed(backend, research.retries, max_chars))
        }
        "openai_compat" => {
            let base_url = research.openai_compat.base_url.trim();
            if base_url.is_empty() {
                bail!("OpenAI-compatible base_url is required");
            }
            let api_key = load_api_key(&research.openai_compat.api_key_env, "openai_compat")?;
            Ok(boxed(
                OpenAiCompatBackend::new(api_key, base_url.to_string(), llm_config),
                research.retries,
                max_chars,
            ))
        }
        "stub" => Ok(Box::new(StubResearcher::canned())),
        other => bail!("Unknown research provider: {}", other),
    }
}

fn boxed<B>(backend: B, retries: u32, max_chars: usize) -> Box<dyn Researcher>
where
    B: CompletionBackend + 'static,
{
    Box::new(LlmResearcher::new(backend, retries).with_max_chars(max_chars))
}

fn adapter_llm_config(config: &AppConfig) -> AdapterLlmConfig {
    AdapterLlmConfig {
        model: config.research.model.clone(),
        temperature: config.research.temperature,
        max_output_tokens: config.research.max_output_tokens,
        timeout_secs: config.research.timeout_secs,
        retries: config.research.retries,
    }
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for {}", provider);
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing API key env var {} for {}", env_var, provider))?;

    if key.trim().is_empty() {
        bail!("API key env var {} is empty for {}", env_var, provider);
    }

    Ok(SecretString::new(key.into()))
}

pub(crate) fn print_draft(draft: &ThreadDraft) {
    println!("Thread {} ({} posts)", draft.id, draft.thread.len());
    println!("Topic: {}", draft.topic);
    println!();
    print_posts(&draft.thread.posts);
}

pub(crate) fn print_posts(posts: &[String]) {
    for (i, post) in posts.iter().enumerate() {
        println!("[{}] ({} chars)", i + 1, post.chars().count());
        println!("{}", post);
        println!();
    }
}
