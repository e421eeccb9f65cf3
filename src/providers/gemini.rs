//! Google Gemini generateContent client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, ProviderResult,
};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini API client
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http_client: Client,
    default_model: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            http_client: Client::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ProviderError::Config("GEMINI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
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
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(response: &GeminiResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text = candidate
        .content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("");
    Some(text)
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let start = Instant::now();

        // Gemini has no role field here; the prompt text goes in as-is.
        let contents = request
            .messages
            .iter()
            .map(|m| Content {
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let body = GeminiRequest {
            contents,
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        };

        let response = self
            .http_client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
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
            return Err(ProviderError::RateLimited { retry_after_ms });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<GeminiError>(&body) {
                Ok(error) => error.error.message,
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };

            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Auth(message),
                400 => ProviderError::InvalidRequest(message),
                _ => ProviderError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let api_response: GeminiResponse = response.json().await?;

        let content = candidate_text(&api_response)
            .ok_or_else(|| ProviderError::Parse("no candidates in response".to_string()))?;

        Ok(CompletionResponse {
            content: content.trim().to_string(),
            model: api_response
                .model_version
                .unwrap_or_else(|| self.default_model.clone()),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let client = GeminiClient::new("test-key-not-real".to_string());
        assert_eq!(client.name(), "gemini");
        assert_eq!(client.default_model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_builder_overrides() {
        let client = GeminiClient::new("k".to_string())
            .with_base_url("http://localhost:9999")
            .with_model("gemini-1.5-pro");
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.default_model(), "gemini-1.5-pro");
    }

    #[test]
    fn test_candidate_text_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "1. A\n"}, {"text": "2. 110"}]}}
            ],
            "modelVersion": "gemini-2.0-flash"
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(candidate_text(&response).as_deref(), Some("1. A\n2. 110"));
    }

    #[test]
    fn test_empty_candidates() {
        let json = r#"{"candidates": []}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(candidate_text(&response), None);
    }
}
