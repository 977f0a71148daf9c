//! Streaming chat completions against an OpenAI-compatible API.
//!
//! Behaviour:
//! - `POST {base_url}/chat/completions` with `stream: true` and a single user message.
//! - The body is a server-sent-event stream; [`CompletionStream`] pulls it line by line
//!   and yields each non-empty content delta in arrival order.
//! - `data: [DONE]` ends the stream. No retries.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::analysis::core::config::LlmConfig;
use crate::analysis::core::errors::{AnalysisError, AnalysisResult};

/// Marker payload that terminates the event stream.
const DONE_MARKER: &str = "[DONE]";
/// Prefix of event lines carrying a payload.
const DATA_PREFIX: &str = "data:";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

/// Blocking client for streamed chat completions.
pub struct CompletionClient {
    client: Client,
    base_url: String,
}

impl CompletionClient {
    /// Build a client from the completion settings.
    ///
    /// Only the connect phase is bounded; a stream may run as long as the provider keeps it open.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> AnalysisResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(None)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint the client posts to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Start a streamed completion for `prompt`.
    ///
    /// # Errors
    /// Returns an error if the key is blank, the request fails, or the API rejects it.
    pub fn stream_chat(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> AnalysisResult<CompletionStream<BufReader<Response>>> {
        if api_key.trim().is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }

        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        tracing::info!(model, prompt_chars = prompt.chars().count(), "requesting completion");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.trim())
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(CompletionStream::new(BufReader::new(response)))
    }
}

fn api_error(status: u16, body: &str) -> AnalysisError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    tracing::warn!(status, %message, "completion request rejected");
    AnalysisError::Api { status, message }
}

/// Pull-based iterator over the content deltas of an event stream.
pub struct CompletionStream<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> CompletionStream<R> {
    /// Wrap a buffered event-stream body.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }

    /// Drain the stream into one string.
    ///
    /// # Errors
    /// Returns the first error met while reading.
    pub fn collect_text(self) -> AnalysisResult<String> {
        self.collect()
    }

    fn next_event(&mut self) -> AnalysisResult<Option<String>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                // `event:`, `id:` and `retry:` fields carry nothing we render.
                continue;
            };
            let payload = payload.trim_start();
            if payload == DONE_MARKER {
                return Ok(None);
            }

            let chunk: ChatChunk = serde_json::from_str(payload)?;
            if let Some(error) = chunk.error {
                return Err(AnalysisError::Api {
                    status: 0,
                    message: error.message,
                });
            }

            let content: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.and_then(|delta| delta.content))
                .collect();
            if !content.is_empty() {
                return Ok(Some(content));
            }
        }
    }
}

impl<R: BufRead> Iterator for CompletionStream<R> {
    type Item = AnalysisResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_event() {
            Ok(Some(content)) => Some(Ok(content)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
