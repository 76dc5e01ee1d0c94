// SPDX-License-Identifier: MIT

//! Runtime configuration from environment variables
//!
//! Everything is read once at startup. The model client and safety filter
//! built from an `AppConfig` are shared by every request.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::adk::error::{ModelError, NourishError, Result};
use crate::adk::model::anthropic::AnthropicModel;
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::retry::RetryingModel;
use crate::adk::model::{GenerationConfig, Model};
use crate::nourish::safety::{SafetyFilter, SafetyPatterns};

pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF_MS: u64 = 500;

/// Supported generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    /// OpenAI-compatible endpoint hosted by Groq
    Groq,
    Anthropic,
}

impl Provider {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "groq" => Ok(Provider::Groq),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(ModelError::UnsupportedProvider(other.to_string()).into()),
        }
    }

    /// Guess the provider from a model name
    pub fn infer(model_name: &str) -> Self {
        let lower = model_name.to_lowercase();
        if lower.starts_with("claude") {
            Provider::Anthropic
        } else if lower.contains('/') {
            // Namespaced ids such as `openai/gpt-oss-120b` are Groq-hosted
            Provider::Groq
        } else {
            Provider::OpenAI
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn base_url_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_BASE_URL",
            Provider::Groq => "GROQ_BASE_URL",
            Provider::Anthropic => "ANTHROPIC_BASE_URL",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: Provider,
    pub model_name: String,
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_retries: u32,
    pub timeout: Option<Duration>,
    pub safety_patterns_file: Option<PathBuf>,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model_name = get("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let provider = match get("MODEL_PROVIDER") {
            Some(name) => Provider::parse(&name)?,
            None => Provider::infer(&model_name),
        };

        let api_key = get(provider.key_var()).ok_or_else(|| {
            NourishError::config(format!("{} must be set", provider.key_var()))
        })?;

        let base_url = get(provider.base_url_var())
            .unwrap_or_else(|| provider.default_base_url().to_string());
        Url::parse(&base_url).map_err(|e| {
            NourishError::config(format!("Invalid {}: {}", provider.base_url_var(), e))
        })?;

        let temperature = parse_or("MODEL_TEMPERATURE", get("MODEL_TEMPERATURE"), 0.0)?;
        let max_retries = parse_or(
            "MODEL_MAX_RETRIES",
            get("MODEL_MAX_RETRIES"),
            DEFAULT_MAX_RETRIES,
        )?;
        let timeout = get("MODEL_TIMEOUT_SECS")
            .map(|v| parse_value::<u64>("MODEL_TIMEOUT_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);
        let port = parse_or("NOURISH_PORT", get("NOURISH_PORT"), DEFAULT_PORT)?;

        Ok(Self {
            provider,
            model_name,
            api_key,
            base_url,
            temperature,
            max_retries,
            timeout,
            safety_patterns_file: get("SAFETY_PATTERNS_FILE").map(PathBuf::from),
            port,
            static_dir: get("NOURISH_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
        })
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(self.temperature),
            ..GenerationConfig::default()
        }
    }

    /// Build the model client, wrapped with the configured retry policy
    pub fn create_model(&self) -> Result<Arc<dyn Model>> {
        log::debug!(
            "Using provider {:?} with model '{}' at {}",
            self.provider,
            self.model_name,
            self.base_url
        );

        let inner: Arc<dyn Model> = match self.provider {
            Provider::OpenAI | Provider::Groq => Arc::new(OpenAIModel::with_endpoint(
                self.api_key.clone(),
                self.base_url.clone(),
                self.model_name.clone(),
                self.timeout,
            )?),
            Provider::Anthropic => Arc::new(AnthropicModel::with_endpoint(
                self.api_key.clone(),
                self.base_url.clone(),
                self.model_name.clone(),
                self.timeout,
            )?),
        };

        if self.max_retries == 0 {
            return Ok(inner);
        }
        Ok(Arc::new(RetryingModel::new(
            inner,
            self.max_retries,
            RETRY_BACKOFF_MS,
        )))
    }

    /// Build the safety filter from the pattern file, or the built-in lists
    pub fn create_safety_filter(&self) -> Result<Arc<SafetyFilter>> {
        let filter = match &self.safety_patterns_file {
            Some(path) => {
                log::info!("Loading safety patterns from {}", path.display());
                let patterns = SafetyPatterns::from_yaml_file(path)?;
                SafetyFilter::from_patterns(&patterns).map_err(|e| {
                    NourishError::config(format!("Invalid safety pattern: {}", e))
                })?
            }
            None => SafetyFilter::new(),
        };
        Ok(Arc::new(filter))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| NourishError::config(format!("Invalid {} '{}': {}", key, value, e)))
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("GROQ_API_KEY", "gsk-test")]).unwrap();

        assert_eq!(config.model_name, DEFAULT_MODEL);
        assert_eq!(config.provider, Provider::Groq);
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.timeout, None);
        assert_eq!(config.port, 5000);
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert!(config.safety_patterns_file.is_none());
    }

    #[test]
    fn test_provider_inference() {
        assert_eq!(Provider::infer("claude-sonnet-4"), Provider::Anthropic);
        assert_eq!(Provider::infer("gpt-4o-mini"), Provider::OpenAI);
        assert_eq!(Provider::infer("openai/gpt-oss-120b"), Provider::Groq);
    }

    #[test]
    fn test_explicit_provider_wins() {
        let config = config_from(&[
            ("MODEL_PROVIDER", "openai"),
            ("MODEL_NAME", "openai/gpt-oss-120b"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
        ])
        .unwrap();

        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = config_from(&[("MODEL_NAME", "claude-sonnet-4")]).unwrap_err();
        assert!(matches!(err, NourishError::Config(ref m) if m.contains("ANTHROPIC_API_KEY")));
    }

    #[test]
    fn test_unknown_provider() {
        let err = config_from(&[("MODEL_PROVIDER", "gemini")]).unwrap_err();
        assert!(matches!(
            err,
            NourishError::Model(ModelError::UnsupportedProvider(ref p)) if p == "gemini"
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = config_from(&[
            ("MODEL_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "not a url"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("OPENAI_BASE_URL"));
    }

    #[test]
    fn test_numeric_overrides() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("MODEL_NAME", "gpt-4o-mini"),
            ("MODEL_TEMPERATURE", "0.4"),
            ("MODEL_MAX_RETRIES", "0"),
            ("MODEL_TIMEOUT_SECS", "30"),
            ("NOURISH_PORT", "8081"),
        ])
        .unwrap();

        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.port, 8081);
        assert_eq!(config.generation_config().temperature, Some(0.4));
    }

    #[test]
    fn test_bad_port() {
        let err = config_from(&[("GROQ_API_KEY", "k"), ("NOURISH_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("NOURISH_PORT"));
    }

    #[test]
    fn test_create_model_and_filter() {
        let config = config_from(&[("GROQ_API_KEY", "gsk-test")]).unwrap();
        let model = config.create_model().unwrap();
        assert_eq!(model.provider(), "openai");

        let filter = config.create_safety_filter().unwrap();
        assert!(!filter.validate_input("jailbreak").is_safe());
    }
}
