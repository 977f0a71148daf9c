//! Analysis subsystem for the marketing analyst.
//!
//! Organized into:
//! - `core`: Configuration, errors, and use cases
//! - `input`: Uploaded delimited files and typed documents
//! - `prompt`: Prompt construction and token budgeting
//! - `gate`: Precondition checks in front of the completion call

pub mod core;
pub mod gate;
pub mod input;
pub mod prompt;

pub use self::core::{
    AnalysisError, AnalysisResult, AnalystConfig, BudgetConfig, LlmConfig, SUPPORTED_MODELS,
    ServerConfig, UseCase, UseCaseTemplate,
};
pub use gate::{AnalysisRequest, Gate, prepare};
pub use input::{Document, DocumentSource, Table};
pub use prompt::{TokenBudget, TokenUsage, build_prompt, build_prompt_for_label, count_tokens};
