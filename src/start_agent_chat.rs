//! Startup helpers shared by the agent chat binaries.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::llm::OllamaChat;
use crate::server::{self, AppState};

/// Install the `tracing` subscriber shared by both binaries.
///
/// `RUST_LOG` directives are honoured; INFO is the default level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the relay server until Ctrl-C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run_server() -> ExitCode {
    init_tracing();

    tracing::info!("Starting agent chat server v{}", env!("CARGO_PKG_VERSION"));

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!("Ollama endpoint: {} (model {})", config.ollama_url, config.model);

    let generator = match OllamaChat::from_config(&config) {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("Failed to create Ollama client: {e}");
            return ExitCode::from(1);
        }
    };
    let state = AppState::new(Arc::new(generator));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {e}");
        }
        tracing::info!("Shutting down");
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, config.port, shutdown)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
