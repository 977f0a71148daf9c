//! HTTP server binary exposing the analysis API.

use std::process::ExitCode;

use marketing_analyst::start_marketing_analyst;

fn main() -> ExitCode {
    start_marketing_analyst::run_server()
}
