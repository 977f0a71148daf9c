//! Relay of streamed completion chunks to an output sink.

use std::io::Write;

use crate::analysis::core::errors::{AnalysisError, AnalysisResult};

/// User-facing prefix for any failure of the completion call.
pub const ERROR_PREFIX: &str = "오류가 발생했습니다";

/// Counters for one relayed stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RelayStats {
    /// Chunks written.
    pub chunks: usize,
    /// Characters written.
    pub chars: usize,
}

/// Write each chunk to `out` as it arrives, flushing after every chunk.
///
/// Stops at the first error; whatever was already written stays written.
///
/// # Errors
/// Returns the stream error or the write error that stopped the relay.
pub fn relay_stream<I, W>(chunks: I, out: &mut W) -> AnalysisResult<RelayStats>
where
    I: IntoIterator<Item = AnalysisResult<String>>,
    W: Write,
{
    let mut stats = RelayStats::default();
    for chunk in chunks {
        let chunk = chunk?;
        out.write_all(chunk.as_bytes())?;
        out.flush()?;
        stats.chunks += 1;
        stats.chars += chunk.chars().count();
    }
    out.write_all(b"\n")?;
    out.flush()?;
    tracing::debug!(chunks = stats.chunks, chars = stats.chars, "stream relayed");
    Ok(stats)
}

/// The single message shown for any completion failure.
#[must_use]
pub fn error_message(err: &AnalysisError) -> String {
    format!("{ERROR_PREFIX}: {err}")
}
