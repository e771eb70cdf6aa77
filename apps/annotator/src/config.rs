use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::local::DEFAULT_OLLAMA_URL;
use crate::llm_client::remote::GROQ_API_URL;
use crate::llm_client::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Nothing is strictly required: the remote API key is checked only when the
/// remote backend is selected.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub ollama_url: String,
    pub llm_max_attempts: u32,
    pub llm_backoff_secs: u64,
    pub job_description_path: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            groq_api_key: get("GROQ_API_KEY"),
            groq_api_url: get("GROQ_API_URL").unwrap_or_else(|| GROQ_API_URL.to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            llm_max_attempts: parse_or(get("LLM_MAX_ATTEMPTS"), "LLM_MAX_ATTEMPTS", 5)?,
            llm_backoff_secs: parse_or(get("LLM_BACKOFF_SECS"), "LLM_BACKOFF_SECS", 10)?,
            job_description_path: get("JOB_DESCRIPTION_PATH").map(PathBuf::from),
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.llm_max_attempts.max(1),
            backoff: Duration::from_secs(self.llm_backoff_secs),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        None => Ok(default),
    }
}
