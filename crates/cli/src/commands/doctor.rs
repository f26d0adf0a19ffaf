//! Doctor command - validate configuration and show status

use anyhow::{Result, bail};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::commands::history::build_history_store;
use crate::commands::post::build_poster;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    research: Option<CheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<CheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<CheckResult>,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let selected = |name: &str| args.check.as_deref().is_none_or(|c| c == name);

    if let Some(ref check) = args.check {
        if !["research", "x", "history"].contains(&check.as_str()) {
            bail!("Unknown check: {} (expected research, x or history)", check);
        }
    }

    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        research: None,
        x: None,
        history: None,
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        if selected("research") {
            report.research = Some(check_research(config));
        }
        if selected("x") {
            report.x = Some(check_x(config, args.online).await);
        }
        if selected("history") {
            report.history = Some(check_history(config).await);
        }
    }

    // Determine overall status
    let checks: Vec<&CheckResult> = std::iter::once(&report.config)
        .chain(report.research.as_ref())
        .chain(report.x.as_ref())
        .chain(report.history.as_ref())
        .collect();

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_research(config: &AppConfig) -> CheckResult {
    let research = &config.research;
    let provider = &research.provider;
    let model = &research.model;

    if let Err(e) = research.depth() {
        return CheckResult::error(format!("{:#}", e));
    }
    if let Err(e) = config.thread.mode() {
        return CheckResult::error(format!("{:#}", e));
    }

    // Check if API key env var is set (without revealing the value)
    let api_key_env = match provider.as_str() {
        "gemini" => &research.gemini.api_key_env,
        "openai" => &research.openai.api_key_env,
        "anthropic" => &research.anthropic.api_key_env,
        "ollama" => {
            return CheckResult::ok(format!(
                "Provider: ollama, Model: {}, base_url: {}",
                model, research.ollama.base_url
            ));
        }
        "openai_compat" => {
            if research.openai_compat.base_url.trim().is_empty() {
                return CheckResult::error("OpenAI-compatible base_url is empty");
            }
            &research.openai_compat.api_key_env
        }
        "stub" => return CheckResult::ok("Provider: stub (offline)"),
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    };

    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    match std::env::var(api_key_env) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        )),
        _ => CheckResult::warn(format!(
            "Provider: {}, Model: {}, API key: {} (not set)",
            provider, model, api_key_env
        )),
    }
}

async fn check_x(config: &AppConfig, online: bool) -> CheckResult {
    let env_var = &config.x.user_token_env;

    if env_var.is_empty() {
        return CheckResult::error("No user token env var configured");
    }

    let mode = if config.general.dry_run {
        "dry run"
    } else {
        "live"
    };

    let token_set = matches!(std::env::var(env_var), Ok(val) if !val.is_empty());
    if !token_set {
        let message = format!("User token: {} (not set), Mode: {}", env_var, mode);
        // Live posting cannot work without it
        return if config.general.dry_run {
            CheckResult::warn(message)
        } else {
            CheckResult::error(message)
        };
    }

    if !online {
        return CheckResult::ok(format!("User token: {} (set), Mode: {}", env_var, mode));
    }

    let poster = match build_poster(config, false) {
        Ok(p) => p,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    match poster.verify_credentials().await {
        Ok(account) => CheckResult::ok(format!(
            "Authenticated as @{}, Mode: {}",
            account.username, mode
        ))
        .with_details(serde_json::json!({
            "id": account.id,
            "username": account.username,
        })),
        Err(e) => CheckResult::error(format!("Credential check failed ({}): {}", e.kind(), e)),
    }
}

async fn check_history(config: &AppConfig) -> CheckResult {
    let backend = &config.general.history_backend;
    let path = &config.general.history_path;

    let store = match build_history_store(config).await {
        Ok(s) => s,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    match store.list().await {
        Ok(entries) => CheckResult::ok(format!(
            "Backend: {}, Path: {}, {} entries",
            backend,
            path.display(),
            entries.len()
        ))
        .with_details(serde_json::json!({ "entries": entries.len() })),
        Err(e) => CheckResult::error(format!("Failed to read history: {}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("threadsmith Doctor Report");
    println!("=========================");
    println!();

    print_check("Config", &report.config);
    if let Some(ref check) = report.research {
        print_check("Research", check);
    }
    if let Some(ref check) = report.x {
        print_check("X", check);
    }
    if let Some(ref check) = report.history {
        print_check("History", check);
    }

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: threadsmith run --topic \"...\" --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
