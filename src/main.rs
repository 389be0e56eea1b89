//! Terminal chat client for the agent backend.
//! Run with: cargo run --bin agent-chat

use std::process::ExitCode;

use agent_chat::config::ClientConfig;
use agent_chat::{console, start_agent_chat};

fn main() -> ExitCode {
    start_agent_chat::init_tracing();

    let config = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(console::run(&config)) {
        tracing::error!("Console error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
