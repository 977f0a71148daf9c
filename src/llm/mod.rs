//! LLM-focused components: streamed chat completions.

pub mod openai_stream;

pub use openai_stream::{CompletionClient, CompletionStream};
