//! Provider trait definitions for LLM API clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a completion from an LLM provider
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, max_tokens: u32) -> Self {
        Self {
            model: None,
            messages,
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub latency_ms: u64,
}

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Rate limiting, timeouts, transport hiccups, and generic API errors
    /// are transient; auth failures, malformed requests, and
    /// configuration problems are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Http(_)
                | ProviderError::Api { .. }
                | ProviderError::RateLimited { .. }
                | ProviderError::Timeout { .. }
        )
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for LLM providers
///
/// Every call is stateless: no conversation history or session carries
/// over between requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "deepseek", "gemini")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;

    /// Send a completion request
    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse>;

    /// Check if the provider is healthy/accessible
    async fn health_check(&self) -> ProviderResult<bool> {
        let request = CompletionRequest::new(vec![Message::user("Hi")], 10);

        match self.complete(&request).await {
            Ok(_) => Ok(true),
            Err(ProviderError::RateLimited { .. }) => Ok(true), // still healthy, just busy
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::RateLimited {
            retry_after_ms: Some(20_000)
        }
        .is_transient());
        assert!(ProviderError::Api {
            status: 500,
            message: "hiccup".to_string()
        }
        .is_transient());
        assert!(ProviderError::Timeout { timeout_ms: 1000 }.is_transient());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!ProviderError::Auth("bad key".to_string()).is_transient());
        assert!(!ProviderError::InvalidRequest("bad body".to_string()).is_transient());
        assert!(!ProviderError::Config("no key set".to_string()).is_transient());
        assert!(!ProviderError::Parse("garbage".to_string()).is_transient());
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new(vec![Message::user("hello")], 256)
            .with_model("o3-mini")
            .with_temperature(0.7);
        assert_eq!(request.model.as_deref(), Some("o3-mini"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.messages[0].role, "user");
    }
}
