/// Model Gateway: the single point of entry for every model completion in the annotator.
///
/// ARCHITECTURAL RULE: annotation code never talks to a backend directly.
/// It receives an `Arc<dyn ModelGateway>` and calls `complete()`.
///
/// Transient failures (429, 5xx, connection errors) are retried here with a fixed
/// backoff. Whatever text comes back is returned untouched; validating it is the
/// response parser's job.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod local;
pub mod prompts;
pub mod remote;

pub use local::OllamaClient;
pub use remote::GroqClient;

/// Default model for the remote backend.
pub const DEFAULT_REMOTE_MODEL: &str = "llama-3.3-70b-versatile";
/// Default model for the local backend.
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transient backend error (status {status}): {message}")]
    Transient { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backend failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Remote backend requires GROQ_API_KEY")]
    MissingApiKey,
}

impl LlmError {
    /// Rate limiting, server errors and connection failures are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Transient { .. } => true,
            LlmError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

/// Which backend serves a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Remote,
    Local,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Remote => write!(f, "remote"),
            Backend::Local => write!(f, "local"),
        }
    }
}

/// Uniform completion contract over every backend.
///
/// Implementations must be safe to call concurrently; each call is independent.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str, backend: Backend)
        -> Result<String, LlmError>;
}

/// Fixed-backoff retry schedule for transient backend failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
        }
    }
}

/// Runs `call` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up. Exhaustion surfaces as `LlmError::Exhausted`.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error: Option<LlmError> = None;

    for attempt in 1..=attempts {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                warn!(
                    "Backend call attempt {}/{} failed: {}",
                    attempt, attempts, e
                );
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(LlmError::Exhausted {
        attempts,
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// The gateway used by the binary: a local Ollama client plus an optional
/// Groq client, sharing one retry policy.
#[derive(Clone)]
pub struct LlmClient {
    remote: Option<GroqClient>,
    local: OllamaClient,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(remote: Option<GroqClient>, local: OllamaClient, retry: RetryPolicy) -> Self {
        Self {
            remote,
            local,
            retry,
        }
    }

    pub fn local(&self) -> &OllamaClient {
        &self.local
    }
}

#[async_trait]
impl ModelGateway for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        backend: Backend,
    ) -> Result<String, LlmError> {
        let text = match backend {
            Backend::Remote => {
                let remote = self.remote.as_ref().ok_or(LlmError::MissingApiKey)?;
                with_backoff(&self.retry, || remote.chat(prompt, model)).await?
            }
            Backend::Local => with_backoff(&self.retry, || self.local.chat(prompt, model)).await?,
        };

        debug!(
            "{} completion from {} returned {} chars",
            backend,
            model,
            text.len()
        );
        Ok(text)
    }
}

/// Maps an HTTP status to the gateway taxonomy: 429 and 5xx are transient.
pub(crate) fn classify_status(status: reqwest::StatusCode, message: String) -> LlmError {
    if status.as_u16() == 429 || status.is_server_error() {
        LlmError::Transient {
            status: status.as_u16(),
            message,
        }
    } else {
        LlmError::Api {
            status: status.as_u16(),
            message,
        }
    }
}
