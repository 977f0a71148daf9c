//! Token budget enforcement utilities.
//!
//! A token is a maximal run of non-whitespace characters. Appending text can merge with the
//! last token or add new ones but never removes one, so counts only grow as input grows.
//! The budget never trims text: it only decides whether a request may be sent.

use serde::{Deserialize, Serialize};

use crate::analysis::core::config::BudgetConfig;

/// Number of whitespace-separated tokens in `text`; zero for the empty string.
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Token counts for the two user-supplied inputs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the document.
    pub document: usize,
    /// Tokens in the question.
    pub question: usize,
}

impl TokenUsage {
    /// Count document and question separately.
    #[must_use]
    pub fn measure(document: &str, question: &str) -> Self {
        Self {
            document: count_tokens(document),
            question: count_tokens(question),
        }
    }

    /// Document plus question.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.document.saturating_add(self.question)
    }
}

/// Fixed ceiling on input tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Largest total that still passes.
    pub ceiling: usize,
}

impl TokenBudget {
    /// Create a budget with the given ceiling.
    #[must_use]
    pub const fn new(ceiling: usize) -> Self {
        Self { ceiling }
    }

    /// True when `usage` is at or under the ceiling.
    #[must_use]
    pub const fn allows(&self, usage: TokenUsage) -> bool {
        usage.total() <= self.ceiling
    }

    /// Tokens left before the ceiling is reached.
    #[must_use]
    pub const fn remaining(&self, usage: TokenUsage) -> usize {
        self.ceiling.saturating_sub(usage.total())
    }
}

impl From<&BudgetConfig> for TokenBudget {
    fn from(config: &BudgetConfig) -> Self {
        Self::new(config.max_tokens)
    }
}
