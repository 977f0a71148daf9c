//! Prompt construction modules.

pub mod prompt_budget;
pub mod prompt_builder;

pub use prompt_budget::{TokenBudget, TokenUsage, count_tokens};
pub use prompt_builder::{PREAMBLE, build_prompt, build_prompt_for_label};
