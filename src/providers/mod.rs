//! LLM provider implementations

pub mod dry_run;
pub mod gemini;
pub mod openai;
pub mod traits;

pub use dry_run::DryRunClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use traits::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, ProviderError, ProviderResult,
};

use std::sync::Arc;

use crate::config::Config;

/// Resolve the API key for a provider, honoring an `api_key_env`
/// override from the config file.
fn resolve_api_key(config: &Config, name: &str, default_env: &str) -> ProviderResult<String> {
    let env_var = config
        .get_provider(name)
        .map(|pc| pc.api_key_env.as_str())
        .filter(|v| !v.is_empty())
        .unwrap_or(default_env);

    std::env::var(env_var).map_err(|_| ProviderError::Config(format!("{} not set", env_var)))
}

fn configure_openai(mut client: OpenAiClient, config: &Config, name: &str) -> OpenAiClient {
    if let Some(pc) = config.get_provider(name) {
        if let Some(url) = &pc.base_url {
            client = client.with_base_url(url);
        }
        if !pc.model.is_empty() {
            client = client.with_model(&pc.model);
        }
    }
    client
}

fn configure_gemini(mut client: GeminiClient, config: &Config) -> GeminiClient {
    if let Some(pc) = config.get_provider("gemini") {
        if let Some(url) = &pc.base_url {
            client = client.with_base_url(url);
        }
        if !pc.model.is_empty() {
            client = client.with_model(&pc.model);
        }
    }
    client
}

/// Create a provider by name, applying settings from config
pub fn create_provider(
    name: &str,
    config: &Config,
) -> ProviderResult<Arc<dyn LlmProvider + Send + Sync>> {
    match name.to_lowercase().as_str() {
        "openai" | "gpt" | "chatgpt" => {
            let api_key = resolve_api_key(config, "openai", "OPENAI_API_KEY")?;
            Ok(Arc::new(configure_openai(
                OpenAiClient::openai(api_key),
                config,
                "openai",
            )))
        }
        "deepseek" => {
            let api_key = resolve_api_key(config, "deepseek", "DEEPSEEK_API_KEY")?;
            Ok(Arc::new(configure_openai(
                OpenAiClient::deepseek(api_key),
                config,
                "deepseek",
            )))
        }
        "gemini" | "google" => {
            let api_key = resolve_api_key(config, "gemini", "GEMINI_API_KEY")?;
            Ok(Arc::new(configure_gemini(GeminiClient::new(api_key), config)))
        }
        "dry-run" | "dry_run" => Ok(Arc::new(DryRunClient::new(
            config.survey.question_count,
        ))),
        _ => Err(ProviderError::Config(format!("unknown provider: {}", name))),
    }
}

/// Create every enabled provider whose API key is available
pub fn create_all_providers(config: &Config) -> Vec<Arc<dyn LlmProvider + Send + Sync>> {
    let mut providers: Vec<Arc<dyn LlmProvider + Send + Sync>> = Vec::new();

    for name in ["openai", "deepseek", "gemini"] {
        let enabled = config
            .get_provider(name)
            .map(|pc| pc.enabled)
            .unwrap_or(true);
        if !enabled {
            continue;
        }
        match create_provider(name, config) {
            Ok(provider) => providers.push(provider),
            Err(e) => tracing::debug!("skipping provider {}: {}", name, e),
        }
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider() {
        let config = Config::default();
        let result = create_provider("totally-unknown", &config);
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }

    #[test]
    fn test_dry_run_needs_no_key() {
        let config = Config::default();
        let provider = create_provider("dry-run", &config).unwrap();
        assert_eq!(provider.name(), "dry-run");
    }
}
