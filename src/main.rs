//! Binary entrypoint that runs one interactive analysis session.

use std::process::ExitCode;

use marketing_analyst::start_marketing_analyst;

/// Collect data, a use case, and a question, then stream the model's analysis.
fn main() -> ExitCode {
    start_marketing_analyst::run_session()
}
