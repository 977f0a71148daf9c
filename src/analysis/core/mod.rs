//! Core analysis types: configuration, errors, and use cases.

pub mod config;
pub mod errors;
pub mod use_case;

pub use config::{AnalystConfig, BudgetConfig, LlmConfig, SUPPORTED_MODELS, ServerConfig};
pub use errors::{AnalysisError, AnalysisResult};
pub use use_case::{UseCase, UseCaseParseError, UseCaseTemplate};
