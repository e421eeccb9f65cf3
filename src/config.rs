//! Configuration management for the survey harness
//!
//! Loads provider and run settings from TOML files and provides runtime
//! access.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::parser::ParserMode;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub survey: SurveyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Environment variable the API key is read from; empty means the
    /// provider's built-in default.
    #[serde(default)]
    pub api_key_env: String,
    /// Override the provider's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model identifier; empty means the provider's built-in default.
    #[serde(default)]
    pub model: String,
    /// How this provider's replies are matched to question numbers.
    #[serde(default)]
    pub parser: ParserMode,
}

/// Survey run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(default = "default_trials")]
    pub trials: u32,
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: usize,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Total attempts per trial, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Longer wait for rate-limit responses, used when the server did
    /// not send a retry-after.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_trials() -> u32 { 100 }
fn default_parallel_requests() -> usize { 5 }
fn default_question_count() -> usize { 14 }
fn default_max_attempts() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 5_000 }
fn default_rate_limit_delay_ms() -> u64 { 20_000 }
fn default_timeout_ms() -> u64 { 120_000 }
fn default_max_tokens() -> u32 { 8_192 }
fn default_temperature() -> Option<f32> { Some(0.7) }
fn default_prompt_file() -> String { "intra-prompt.txt".to_string() }
fn default_output_dir() -> String { "results".to_string() }
fn default_log_dir() -> String { "logs".to_string() }

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            parallel_requests: default_parallel_requests(),
            question_count: default_question_count(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            prompt_file: default_prompt_file(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from the default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = ["config/survey.toml", "survey.toml"];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
            }
        }
        fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Get a specific provider config
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Parser mode for a provider, defaulting to labeled parsing
    pub fn parser_mode(&self, name: &str) -> ParserMode {
        self.get_provider(name)
            .map(|pc| pc.parser)
            .unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert("openai".to_string(), ProviderConfig {
            name: "openai".to_string(),
            enabled: true,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            model: "o3-mini".to_string(),
            parser: ParserMode::Labeled,
        });

        providers.insert("deepseek".to_string(), ProviderConfig {
            name: "deepseek".to_string(),
            enabled: true,
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            base_url: Some("https://api.deepseek.com/v1".to_string()),
            model: "deepseek-reasoner".to_string(),
            // The reasoner tends to answer one question per line without
            // labels.
            parser: ParserMode::Positional,
        });

        providers.insert("gemini".to_string(), ProviderConfig {
            name: "gemini".to_string(),
            enabled: true,
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            model: "gemini-2.0-flash".to_string(),
            parser: ParserMode::Labeled,
        });

        Self {
            providers,
            survey: SurveyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.providers.contains_key("openai"));
        assert!(config.providers.contains_key("deepseek"));
        assert!(config.providers.contains_key("gemini"));
        assert_eq!(config.survey.question_count, 14);
        assert_eq!(config.survey.parallel_requests, 5);
        assert_eq!(config.survey.max_attempts, 3);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[survey]
trials = 10
parallel_requests = 3

[providers.gemini]
name = "gemini"
model = "gemini-2.0-flash"
parser = "labeled"

[providers.deepseek]
name = "deepseek"
model = "deepseek-reasoner"
parser = "positional"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.survey.trials, 10);
        assert_eq!(config.survey.question_count, 14); // default kept
        assert_eq!(config.parser_mode("deepseek"), ParserMode::Positional);
        assert_eq!(config.parser_mode("gemini"), ParserMode::Labeled);
    }

    #[test]
    fn test_parser_mode_defaults_to_labeled() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.parser_mode("nonexistent"), ParserMode::Labeled);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.toml");

        let config = Config::default();
        config.save_toml(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.survey.trials, config.survey.trials);
        assert!(reloaded.providers.contains_key("gemini"));
    }
}
