//! Local backend: an Ollama server reachable without credentials.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{classify_status, LlmError};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: String) -> Self {
        Self {
            // No request timeout: local inference on large prompts can take minutes.
            client: Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let request_body = OllamaChatRequest {
            model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body: OllamaChatResponse = response.json().await?;
        if let Some(tokens) = body.eval_count {
            debug!("Ollama call succeeded: eval_count={}", tokens);
        }
        extract_content(body)
    }

    /// Names of the models installed on the local server.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let tags: OllamaTags = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

fn extract_content(body: OllamaChatResponse) -> Result<String, LlmError> {
    body.message
        .map(|m| m.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyContent)
}
