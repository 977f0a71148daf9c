//! Terminal front end: one interactive analysis per run.

pub mod relay;
pub mod shell;

pub use relay::{ERROR_PREFIX, RelayStats, error_message, relay_stream};
pub use shell::{SessionOutcome, Shell};
