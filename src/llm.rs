//! Language model client for sqlai
//!
//! [`LanguageModel`] is the seam between the translator and whatever service
//! produces text. [`ChatModel`] is the production implementation: it speaks
//! the OpenAI-compatible chat-completions protocol, which Groq, OpenAI and
//! local servers such as Ollama all accept.

use std::future::Future;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{SqlaiError, SqlaiResult};

/// Default chat-completions base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1";
/// Default model name
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
/// Default bound on a single model call
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Settings for the model service
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,
    pub model: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Upper bound on one call, enforced by the translator
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A service that answers a conversation with text
pub trait LanguageModel {
    /// Send the conversation and return the assistant's reply verbatim
    fn complete(&self, messages: &[Message]) -> impl Future<Output = SqlaiResult<String>> + Send;
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct ChatModel {
    client: reqwest::Client,
    config: ModelConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatModel {
    pub fn new(config: ModelConfig) -> SqlaiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SqlaiError::TranslationError(format!("failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }
}

impl LanguageModel for ChatModel {
    async fn complete(&self, messages: &[Message]) -> SqlaiResult<String> {
        let url = self.url();
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            stream: false,
        };
        debug!("posting {} messages to {}", messages.len(), url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SqlaiError::TranslationTimeout(self.config.timeout.as_secs())
            } else {
                SqlaiError::TranslationError(format!("failed to reach model service at {}: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().await));
        }

        let payload: ChatResponse = response.json().await.map_err(|e| {
            SqlaiError::TranslationError(format!("model service returned invalid JSON: {}", e))
        })?;

        Ok(payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Error for a non-success reply, carrying its body or the failure to read it
fn status_error<E: std::fmt::Display>(
    status: reqwest::StatusCode,
    body: Result<String, E>,
) -> SqlaiError {
    match body {
        Ok(text) => {
            SqlaiError::TranslationError(format!("model service returned {}: {}", status, text.trim()))
        }
        Err(e) => SqlaiError::TranslationError(format!(
            "model service returned {}; failed to read response body: {}",
            status, e
        )),
    }
}
