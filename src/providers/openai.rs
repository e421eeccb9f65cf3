//! OpenAI-compatible chat-completions client
//!
//! Covers OpenAI itself (including o1/o3 reasoning models) and DeepSeek,
//! which speaks the same wire format behind a different base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, ProviderResult,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "o3-mini";

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-reasoner";

/// Chat-completions API client
pub struct OpenAiClient {
    name: String,
    api_key: String,
    base_url: String,
    http_client: Client,
    default_model: String,
}

impl OpenAiClient {
    /// Create a client for the OpenAI API
    pub fn openai(api_key: String) -> Self {
        Self {
            name: "openai".to_string(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            http_client: Client::new(),
            default_model: OPENAI_DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client for the DeepSeek API (OpenAI-compatible)
    pub fn deepseek(api_key: String) -> Self {
        Self {
            name: "deepseek".to_string(),
            api_key,
            base_url: DEEPSEEK_BASE_URL.to_string(),
            http_client: Client::new(),
            default_model: DEEPSEEK_DEFAULT_MODEL.to_string(),
        }
    }

    /// Create an OpenAI client from the `OPENAI_API_KEY` environment variable
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::Config("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::openai(api_key))
    }

    /// Create a DeepSeek client from the `DEEPSEEK_API_KEY` environment variable
    pub fn deepseek_from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .map_err(|_| ProviderError::Config("DEEPSEEK_API_KEY not set".to_string()))?;
        Ok(Self::deepseek(api_key))
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    /// For standard models
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// For reasoning models (o1, o3)
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    /// Temperature (not supported by reasoning models)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let start = Instant::now();

        let messages: Vec<ChatMessage> = request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        // Reasoning models reject max_tokens and temperature.
        let is_reasoning = model.starts_with("o1") || model.starts_with("o3");

        let body = ChatRequest {
            model,
            messages,
            max_tokens: if is_reasoning { None } else { Some(request.max_tokens) },
            max_completion_tokens: if is_reasoning { Some(request.max_tokens) } else { None },
            temperature: if is_reasoning { None } else { request.temperature },
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000);

            // Both rate limiting and quota exhaustion come back as 429,
            // but only the former is worth retrying.
            let body = response.text().await.unwrap_or_default();
            if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
                let error_type = error.error.error_type.as_deref().unwrap_or("");
                if error_type == "insufficient_quota"
                    || error.error.message.contains("exceeded your current quota")
                {
                    return Err(ProviderError::Config(format!(
                        "quota exceeded: {}",
                        error.error.message
                    )));
                }
                tracing::debug!("rate limited (type={}): {}", error_type, error.error.message);
            }

            return Err(ProviderError::RateLimited { retry_after_ms });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(error) => error.error.message,
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };

            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Auth(message),
                400 | 422 => ProviderError::InvalidRequest(message),
                _ => ProviderError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let api_response: ChatResponse = response.json().await?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("no choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.trim().to_string(),
            model: api_response.model,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_defaults() {
        let client = OpenAiClient::openai("test-key-not-real".to_string());
        assert_eq!(client.name, "openai");
        assert_eq!(client.default_model(), "o3-mini");
        assert!(client.base_url.contains("api.openai.com"));
    }

    #[test]
    fn test_deepseek_defaults() {
        let client = OpenAiClient::deepseek("test-key-not-real".to_string());
        assert_eq!(client.name, "deepseek");
        assert_eq!(client.default_model(), "deepseek-reasoner");
        assert!(client.base_url.contains("api.deepseek.com"));
    }

    #[test]
    fn test_builder_overrides() {
        let client = OpenAiClient::openai("k".to_string())
            .with_base_url("http://localhost:9999/v1")
            .with_model("o1");
        assert_eq!(client.base_url, "http://localhost:9999/v1");
        assert_eq!(client.default_model(), "o1");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "1: A\n2: 110"}}],
            "model": "o3-mini-2025-01-31"
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content, "1: A\n2: 110");
        assert_eq!(response.model, "o3-mini-2025-01-31");
    }
}
