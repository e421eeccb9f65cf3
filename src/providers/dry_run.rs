//! Canned-response provider for offline runs
//!
//! Lets the whole pipeline (runner, parser, CSV sink) be exercised
//! without network access or API keys.

use async_trait::async_trait;

use super::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderResult,
};

/// Provider that answers every survey question with a fixed value
/// instead of calling a vendor API.
pub struct DryRunClient {
    question_count: usize,
}

impl DryRunClient {
    pub fn new(question_count: usize) -> Self {
        Self { question_count }
    }

    /// Build the canned reply: odd questions answer "A", even questions
    /// answer a number, in the labeled format real models are asked for.
    fn canned_reply(&self) -> String {
        (1..=self.question_count)
            .map(|q| {
                if q % 2 == 1 {
                    format!("{}: A", q)
                } else {
                    format!("{}: {}", q, 100 + q)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl LlmProvider for DryRunClient {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn default_model(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let preview: String = request
            .messages
            .first()
            .map(|m| m.content.chars().take(50).collect())
            .unwrap_or_default();
        tracing::info!("[dry run] prompt preview: {}...", preview);

        Ok(CompletionResponse {
            content: self.canned_reply(),
            model: "canned".to_string(),
            latency_ms: 0,
        })
    }

    async fn health_check(&self) -> ProviderResult<bool> {
        Ok(true)
    }
}
