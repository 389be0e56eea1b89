//! Agent relay server binary.
//! Run with: cargo run --bin agent-chat-server

use std::process::ExitCode;

use agent_chat::start_agent_chat;

fn main() -> ExitCode {
    start_agent_chat::run_server()
}
