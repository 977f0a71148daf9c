//! Error types for the analysis subsystem.

use thiserror::Error;

/// Analysis subsystem error type.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No API key was supplied.
    #[error("an OpenAI API key is required")]
    MissingApiKey,
    /// Delimited file could not be parsed.
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    /// Delimited file parsed but its shape is unusable.
    #[error("malformed table: {0}")]
    MalformedTable(String),
    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The completion API answered with an error.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code, `0` when reported inside the stream.
        status: u16,
        /// Provider error message.
        message: String,
    },
    /// The event stream was malformed.
    #[error("stream error: {0}")]
    Stream(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Terminal prompt error.
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Convenience result alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
