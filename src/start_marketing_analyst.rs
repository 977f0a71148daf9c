//! Startup helpers for the marketing analyst binaries.

use std::process::ExitCode;

use crate::analysis::core::config::AnalystConfig;
use crate::server::{self, AppState};
use crate::session::shell::{SessionOutcome, Shell};

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default.
///
/// Call once per process, before any other tracing.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Option<AnalystConfig> {
    match AnalystConfig::from_env() {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            None
        }
    }
}

/// Run one interactive terminal session (used by the `marketing-analyst` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` unless the terminal fails or the completion call fails.
#[must_use]
pub fn run_session() -> ExitCode {
    init_tracing();
    tracing::debug!("Starting marketing analyst v{}", env!("CARGO_PKG_VERSION"));

    let Some(config) = load_config() else {
        return ExitCode::from(1);
    };

    let mut shell = Shell::new(config, std::io::stdout());
    match shell.run() {
        Ok(SessionOutcome::Failed(_)) => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Session error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Run the HTTP server (used by the `marketing-analyst-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run_server() -> ExitCode {
    init_tracing();
    tracing::info!("Starting marketing analyst server v{}", env!("CARGO_PKG_VERSION"));

    let Some(config) = load_config() else {
        return ExitCode::from(1);
    };
    tracing::info!("Completion endpoint: {}", config.llm.base_url);

    let state = AppState::new(config);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler failed: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, shutdown)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
