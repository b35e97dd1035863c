pub mod assessor;
pub mod chat;
pub mod error;
pub mod prompt;

pub use assessor::LlmAssessor;
pub use chat::{ChatClient, ChatMessage, ChatRole};
pub use error::{LlmError, LlmResult};

use std::time::Duration;

use anyhow::Context;

/// Configuration for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .context("OPENAI_API_KEY not set")?;
        let timeout_secs: u64 = lookup("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".to_string())
            .trim()
            .parse()
            .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            api_key,
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = LlmConfig::new("sk-very-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("gpt-4o-mini"));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = LlmConfig::from_lookup(|key| {
            (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, LlmConfig::DEFAULT_BASE_URL);
        assert_eq!(config.model, LlmConfig::DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_lookup_overrides_and_errors() {
        let config = LlmConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_BASE_URL" => Some("http://localhost:11434/v1".to_string()),
            "OPENAI_MODEL" => Some("llama3".to_string()),
            "LLM_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout, Duration::from_secs(5));

        assert!(LlmConfig::from_lookup(|_| None).is_err());
        assert!(LlmConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "LLM_TIMEOUT_SECS" => Some("a minute".to_string()),
            _ => None,
        })
        .is_err());
    }
}
