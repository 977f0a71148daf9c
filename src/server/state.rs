//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::analysis::core::config::AnalystConfig;
use crate::analysis::prompt::prompt_budget::TokenBudget;

/// Shared application state.
///
/// Read-only after startup; requests never add to it.
#[derive(Debug)]
pub struct AppState {
    /// Read-only configuration.
    pub config: AnalystConfig,
    /// Token ceiling applied to every request.
    pub budget: TokenBudget,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AnalystConfig) -> Arc<Self> {
        let budget = TokenBudget::from(&config.budget);
        Arc::new(Self { config, budget })
    }

    /// Model used when a request names none.
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.config.llm.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_reflects_config() {
        let mut config = AnalystConfig::default();
        config.budget.max_tokens = 120;
        let state = AppState::new(config);
        assert_eq!(state.default_model(), "gpt-3.5-turbo");
        assert_eq!(state.budget.ceiling, 120);
    }
}
