//! Precondition gate in front of the completion call.
//!
//! The shells collect an [`AnalysisRequest`] and ask [`prepare`] whether it may be sent.
//! Checks run in a fixed order: credential, document, question, budget.

use serde::{Deserialize, Serialize};

use crate::analysis::core::use_case::UseCase;
use crate::analysis::prompt::prompt_budget::{TokenBudget, TokenUsage};
use crate::analysis::prompt::prompt_builder::build_prompt;

/// Everything one interaction collected from the user.
#[derive(Clone, Deserialize, Serialize)]
pub struct AnalysisRequest {
    /// User-supplied API key, passed through untouched.
    pub api_key: String,
    /// Selected use case.
    pub use_case: UseCase,
    /// Document text.
    pub document: String,
    /// Question text.
    pub question: String,
    /// Model identifier.
    pub model: String,
}

impl std::fmt::Debug for AnalysisRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisRequest")
            .field("api_key", &"<redacted>")
            .field("use_case", &self.use_case)
            .field("document_len", &self.document.len())
            .field("question_len", &self.question.len())
            .field("model", &self.model)
            .finish()
    }
}

/// Outcome of the precondition checks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Gate {
    /// All checks passed.
    Ready {
        /// Prompt to send.
        prompt: String,
        /// Counted input tokens.
        usage: TokenUsage,
    },
    /// No API key was supplied.
    MissingApiKey,
    /// The document is empty after trimming.
    EmptyDocument,
    /// The question is empty after trimming.
    EmptyQuestion,
    /// Inputs exceed the token ceiling.
    OverBudget {
        /// Counted input tokens.
        usage: TokenUsage,
        /// Configured ceiling.
        ceiling: usize,
    },
}

impl Gate {
    /// True when the completion call may proceed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Token usage when it was computed.
    #[must_use]
    pub const fn usage(&self) -> Option<TokenUsage> {
        match self {
            Self::Ready { usage, .. } | Self::OverBudget { usage, .. } => Some(*usage),
            _ => None,
        }
    }
}

/// Run the precondition checks and build the prompt when they pass.
///
/// A blank document stops the request before tokens are counted.
#[must_use]
pub fn prepare(request: &AnalysisRequest, budget: &TokenBudget) -> Gate {
    if request.api_key.trim().is_empty() {
        return Gate::MissingApiKey;
    }
    if request.document.trim().is_empty() {
        return Gate::EmptyDocument;
    }
    if request.question.trim().is_empty() {
        return Gate::EmptyQuestion;
    }

    let usage = TokenUsage::measure(&request.document, &request.question);
    if !budget.allows(usage) {
        tracing::info!(
            total = usage.total(),
            ceiling = budget.ceiling,
            "request over token budget"
        );
        return Gate::OverBudget {
            usage,
            ceiling: budget.ceiling,
        };
    }

    Gate::Ready {
        prompt: build_prompt(request.use_case, &request.document, &request.question),
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(document: &str, question: &str) -> AnalysisRequest {
        AnalysisRequest {
            api_key: "sk-test".to_string(),
            use_case: UseCase::Summary,
            document: document.to_string(),
            question: question.to_string(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }

    #[test]
    fn test_ready_request_builds_prompt() {
        let req = request("a,b\n1,2\n", "What is the trend?");
        let gate = prepare(&req, &TokenBudget::new(3000));

        match gate {
            Gate::Ready { prompt, usage } => {
                assert!(prompt.contains("a,b\n1,2\n"));
                assert!(prompt.contains("What is the trend?"));
                assert!(usage.total() > 0);
            }
            other => panic!("unexpected gate: {other:?}"),
        }
    }

    #[test]
    fn test_missing_key_blocks_everything() {
        let mut req = request("a,b\n1,2\n", "trend?");
        req.api_key = "  ".to_string();
        assert_eq!(
            prepare(&req, &TokenBudget::new(3000)),
            Gate::MissingApiKey
        );
    }

    #[test]
    fn test_empty_document_is_rejected_regardless_of_budget() {
        let req = request("", "What is the trend?");
        let gate = prepare(&req, &TokenBudget::new(usize::MAX));
        assert_eq!(gate, Gate::EmptyDocument);
        assert!(!gate.is_ready());
        assert_eq!(gate.usage(), None);

        let blank = request(" \n", "What is the trend?");
        assert_eq!(
            prepare(&blank, &TokenBudget::new(0)),
            Gate::EmptyDocument
        );
    }

    #[test]
    fn test_empty_question_is_rejected() {
        let req = request("a,b\n1,2\n", "");
        assert_eq!(
            prepare(&req, &TokenBudget::new(3000)),
            Gate::EmptyQuestion
        );
    }

    #[test]
    fn test_budget_boundary_is_inclusive() {
        let req = request("month,sales\n1,100\n2,140\n", "Which month grew?");
        let total = TokenUsage::measure(&req.document, &req.question).total();

        assert!(prepare(&req, &TokenBudget::new(total)).is_ready());

        let over = prepare(&req, &TokenBudget::new(total - 1));
        assert!(matches!(over, Gate::OverBudget { ceiling, .. } if ceiling == total - 1));
        assert_eq!(over.usage().map(|u| u.total()), Some(total));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", request("doc", "q"));
        assert!(!rendered.contains("sk-test"));
    }
}
