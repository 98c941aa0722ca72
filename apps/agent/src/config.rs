use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub title_model_url: String,
    pub ollama_url: String,
    pub keyword_model: String,
    pub job_site_url: String,
    pub chrome_executable: Option<String>,
    pub browser_headless: bool,
    pub max_concurrent_searches: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            title_model_url: require_env("TITLE_MODEL_URL")?,
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            keyword_model: env_or("KEYWORD_MODEL", "qwen2.5:latest"),
            job_site_url: env_or("JOB_SITE_URL", "https://jobinja.ir"),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok(),
            browser_headless: parse_bool(&env_or("BROWSER_HEADLESS", "true"))
                .context("BROWSER_HEADLESS must be true or false")?,
            max_concurrent_searches: env_or("MAX_CONCURRENT_SEARCHES", "1")
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .context("MAX_CONCURRENT_SEARCHES must be a positive integer")?,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
