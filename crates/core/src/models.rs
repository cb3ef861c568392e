//! # Argus Models
//!
//! Centralized reasoning-service configuration types for the Argus system.
//! These types are constructed once at process start and passed by
//! reference into the reasoning adapter; nothing else reads the
//! environment for credentials.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported reasoning-service providers
///
/// All providers speak the OpenAI-compatible chat-completions protocol:
/// - OpenAI - `OPENAI_API_KEY`
/// - OpenRouter (gateway) - `OPENROUTER_API_KEY`
/// - Local (Ollama-style endpoint) - key optional, a placeholder is sent
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    OpenRouter,
    Local,
}

impl ReasoningProvider {
    /// Get all available providers
    pub fn all() -> Vec<ReasoningProvider> {
        vec![
            ReasoningProvider::OpenAi,
            ReasoningProvider::OpenRouter,
            ReasoningProvider::Local,
        ]
    }

    /// Display name for logs and CLI output
    pub fn display_name(&self) -> &'static str {
        match self {
            ReasoningProvider::OpenAi => "OpenAI",
            ReasoningProvider::OpenRouter => "OpenRouter",
            ReasoningProvider::Local => "Local",
        }
    }

    /// Default chat-completions base URL for the provider
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ReasoningProvider::OpenAi => "https://api.openai.com/v1",
            ReasoningProvider::OpenRouter => "https://openrouter.ai/api/v1",
            ReasoningProvider::Local => "http://localhost:11434/v1",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ReasoningProvider::OpenAi => Some("OPENAI_API_KEY"),
            ReasoningProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            ReasoningProvider::Local => None,
        }
    }

    /// Default model for the provider
    pub fn default_model(&self) -> &'static str {
        match self {
            ReasoningProvider::OpenAi => "gpt-4o-mini",
            ReasoningProvider::OpenRouter => "anthropic/claude-3.5-sonnet",
            ReasoningProvider::Local => "llama3:latest",
        }
    }
}

/// Retry policy for transient reasoning-service failures
///
/// A transient failure is a transport error or a response whose status
/// code is in `retryable_status`. Retry `n` (1-based) sleeps
/// `initial_delay_ms * backoff_base^(n-1)` before the next attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Exponential multiplier applied per retry
    pub backoff_base: f64,
    /// HTTP status codes treated as transient
    pub retryable_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 500,
            backoff_base: 2.0,
            retryable_status: vec![429, 500, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay_ms as f64 * self.backoff_base.powi(exp);
        Duration::from_millis(millis as u64)
    }

    /// Whether a status code is in the transient set
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status.contains(&status)
    }
}

/// Configuration for the reasoning service connection
///
/// ## Example
/// ```rust,ignore
/// use argus_core::models::{ReasoningConfig, ReasoningProvider};
///
/// // Default OpenAI
/// let config = ReasoningConfig::default();
///
/// // Local Ollama-style endpoint
/// let config = ReasoningConfig::with_provider(ReasoningProvider::Local, "llama3:latest");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: ReasoningProvider,
    /// Model name (e.g., "gpt-4o-mini", "llama3:latest")
    pub model: String,
    /// Optional base URL override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    /// Explicit API key; falls back to the provider's environment variable
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        let provider = ReasoningProvider::default();
        Self {
            model: provider.default_model().to_string(),
            provider,
            base_url: None,
            api_key: None,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl ReasoningConfig {
    /// Create a new config with the default provider (OpenAI)
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Create config for a specific provider
    pub fn with_provider(provider: ReasoningProvider, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            provider,
            ..Self::default()
        }
    }

    /// Set base URL (for OpenAI-compatible endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set an explicit API key, bypassing the environment
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Effective base URL (override or provider default), without a trailing slash
    pub fn endpoint(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Resolve the API key: explicit config, then environment.
    /// The Local provider accepts a placeholder key when none is set.
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        match self.provider.api_key_env() {
            Some(var) => std::env::var(var).map_err(|_| anyhow::anyhow!("{} is not set", var)),
            None => Ok("ollama".to_string()),
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
