use std::time::Duration;

use async_trait::async_trait;
use scribe_core::{LlmConfig, ScribeError};
use serde::{Deserialize, Serialize};

/// A message in a chat conversation with the model.
///
/// # Examples
///
/// ```
/// use scribe_summarize::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::new(Role::User, "diff --git a/x b/x");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Build a message from a role and any string-like content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use scribe_summarize::llm::Role;
///
/// assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// A text-generation capability.
///
/// [`OllamaClient`] talks to a real server; tests substitute stubs that
/// count calls or return canned text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, reported in run statistics.
    fn model(&self) -> &str;

    /// Send one non-streaming chat request and return the full reply.
    ///
    /// # Errors
    ///
    /// Implementations return [`ScribeError::ServerUnavailable`] when the
    /// endpoint cannot be reached and [`ScribeError::Llm`] for anything the
    /// endpoint answered with but that could not be used.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, ScribeError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for an Ollama-compatible local inference server.
///
/// Uses `POST {base_url}/api/chat` with streaming disabled, so the whole
/// reply arrives in one response body. Every request is bounded by the
/// configured timeout.
///
/// # Examples
///
/// ```
/// use scribe_core::LlmConfig;
/// use scribe_summarize::llm::OllamaClient;
///
/// let client = OllamaClient::new(&LlmConfig::default()).unwrap();
/// assert_eq!(client.base_url(), "http://localhost:11434");
/// ```
pub struct OllamaClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OllamaClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, ScribeError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            // Inference servers are local; ignore HTTP_PROXY and friends.
            .no_proxy()
            .build()
            .map_err(|e| ScribeError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// List the models the server has pulled (`GET /api/tags`).
    ///
    /// # Errors
    ///
    /// Same contract as [`TextGenerator::generate`].
    pub async fn list_models(&self) -> Result<Vec<String>, ScribeError> {
        let url = format!("{}/api/tags", self.base_url());
        tracing::debug!(%url, "listing models");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ScribeError::Llm(format!(
                "server error {status}: {body_text}"
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ScribeError::Llm(format!("failed to parse model list: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn transport_error(&self, e: reqwest::Error) -> ScribeError {
        if e.is_connect() || e.is_timeout() {
            tracing::debug!(error = %e, "inference server unreachable");
            ScribeError::ServerUnavailable {
                url: self.base_url().to_string(),
            }
        } else {
            ScribeError::Llm(format!("request failed: {e}"))
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, ScribeError> {
        let url = format!("{}/api/chat", self.base_url());
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };
        tracing::debug!(%url, model = %self.config.model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;

        let parsed: Result<ChatResponse, _> = serde_json::from_slice(&bytes);
        if !status.is_success() {
            let detail = match parsed {
                Ok(ChatResponse {
                    error: Some(error), ..
                }) => error,
                _ => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(ScribeError::Llm(format!("server error {status}: {detail}")));
        }

        let parsed = parsed
            .map_err(|e| ScribeError::Llm(format!("failed to parse response: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(ScribeError::Llm(error));
        }

        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        tracing::debug!(chars = content.len(), "received reply");
        Ok(content)
    }
}
