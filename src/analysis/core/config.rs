//! Configuration for the analysis subsystem.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::analysis::core::errors::{AnalysisError, AnalysisResult};

/// Environment variable overriding the completion API base URL.
pub const BASE_URL_ENV: &str = "MARKETING_ANALYST_OPENAI_URL";
/// Environment variable overriding the default model.
pub const MODEL_ENV: &str = "MARKETING_ANALYST_MODEL";
/// Environment variable overriding the token ceiling.
pub const MAX_TOKENS_ENV: &str = "MARKETING_ANALYST_MAX_TOKENS";
/// Environment variable overriding the server port.
pub const PORT_ENV: &str = "MARKETING_ANALYST_PORT";

/// Model identifiers offered by the model selector.
pub const SUPPORTED_MODELS: [&str; 4] = ["gpt-3.5-turbo", "gpt-4o-mini", "gpt-4o", "gpt-4-turbo"];

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnalystConfig {
    /// Completion API settings.
    pub llm: LlmConfig,
    /// Token budget settings.
    pub budget: BudgetConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl AnalystConfig {
    /// Build the default configuration with environment overrides applied.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_env() -> AnalysisResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> AnalysisResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.llm.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.llm.model = model.trim().to_string();
        }
        if let Some(raw) = lookup(MAX_TOKENS_ENV) {
            config.budget.max_tokens = raw.trim().parse().map_err(|_| {
                AnalysisError::InvalidConfig(format!("{MAX_TOKENS_ENV} must be an integer, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup(PORT_ENV) {
            config.server.port = raw.trim().parse().map_err(|_| {
                AnalysisError::InvalidConfig(format!("{PORT_ENV} must be a port number, got {raw:?}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.budget.max_tokens == 0 {
            return Err(AnalysisError::InvalidConfig(
                "budget.max_tokens must be > 0".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        Url::parse(&self.llm.base_url)?;

        Ok(())
    }
}

/// Completion API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without the trailing slash.
    pub base_url: String,
    /// Default model identifier.
    pub model: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: SUPPORTED_MODELS[0].to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl LlmConfig {
    /// Models to offer in a selector: the fixed list, plus the configured default if it is custom.
    #[must_use]
    pub fn selectable_models(&self) -> Vec<String> {
        let mut models: Vec<String> = SUPPORTED_MODELS.iter().map(ToString::to_string).collect();
        if !models.contains(&self.model) {
            models.insert(0, self.model.clone());
        }
        models
    }
}

/// Token budget settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum number of input tokens (document + question).
    pub max_tokens: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { max_tokens: 3000 }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}
