//! Line-oriented terminal front end.
//!
//! Reads the store through the controller and never mutates it directly.
//! Lines starting with `/` are commands; anything else is sent to the agent.
//! A leading `//` sends the rest of the line, with one `/`, as a message.

use std::io::Write;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ClientId, Conversation, ConversationStore, Message, Role};
use crate::client::{AgentTransport, HistoryEntry, HttpAgentClient};
use crate::config::ClientConfig;
use crate::controller::{ChatController, Notification, SendOutcome, Severity};

/// Parsed console input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Send text to the agent.
    Say(String),
    /// Create a conversation.
    New,
    /// Show the sidebar.
    List,
    /// Select the n-th conversation (1-based).
    Switch(usize),
    /// Delete the n-th conversation (1-based).
    Delete(usize),
    /// Rename the n-th conversation (1-based).
    Rename(usize, String),
    /// Show the backend history for this session.
    History,
    /// Clear the backend history for this session.
    Reset,
    /// Show command help.
    Help,
    /// Leave.
    Quit,
    /// Unrecognised or malformed command.
    Invalid(String),
}

impl Command {
    /// Parse one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if let Some(escaped) = trimmed.strip_prefix("//") {
            return Self::Say(format!("/{escaped}"));
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Say(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match name {
            "new" => Self::New,
            "list" | "ls" => Self::List,
            "switch" => parse_index(arg).map_or_else(|| Self::usage("/switch <n>"), Self::Switch),
            "delete" | "rm" => {
                parse_index(arg).map_or_else(|| Self::usage("/delete <n>"), Self::Delete)
            }
            "rename" => {
                let mut args = arg.splitn(2, char::is_whitespace);
                let index = args.next().and_then(parse_index);
                let title = args.next().map(str::trim).unwrap_or_default();
                match index {
                    Some(n) => Self::Rename(n, title.to_string()),
                    None => Self::usage("/rename <n> <title>"),
                }
            }
            "history" => Self::History,
            "reset" => Self::Reset,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Invalid(format!("unknown command: /{other}")),
        }
    }

    fn usage(text: &str) -> Self {
        Self::Invalid(format!("usage: {text}"))
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Help text for the console.
pub const HELP: &str = "\
commands:
  /new                 start a new conversation
  /list                show conversations
  /switch <n>          select conversation n
  /delete <n>          delete conversation n
  /rename <n> <title>  rename conversation n
  /history             show the agent's history for this session
  /reset               clear the agent's history for this session
  /quit                exit
anything else is sent to the agent; start with // to send a line beginning with /";

/// Write the sidebar: position, current marker, title and last-updated date.
///
/// # Errors
/// Returns an error if writing fails.
pub fn render_sidebar(out: &mut impl Write, store: &ConversationStore) -> std::io::Result<()> {
    if store.conversations().is_empty() {
        return writeln!(out, "  (no conversations)");
    }
    let current = store.current_conversation_id();
    for (index, conversation) in store.conversations().iter().enumerate() {
        let marker = if Some(conversation.id) == current { '*' } else { ' ' };
        writeln!(
            out,
            "{marker} {}. {} ({}, {} messages)",
            index + 1,
            conversation.title,
            conversation
                .last_updated
                .with_timezone(&Local)
                .format("%Y-%m-%d"),
            conversation.messages.len()
        )?;
    }
    Ok(())
}

/// Format one transcript line.
#[must_use]
pub fn format_message(message: &Message) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "agent",
    };
    format!(
        "[{}] {who}: {}",
        message.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        message.content
    )
}

/// Write a whole conversation transcript.
///
/// # Errors
/// Returns an error if writing fails.
pub fn render_transcript(out: &mut impl Write, conversation: &Conversation) -> std::io::Result<()> {
    writeln!(out, "── {} ──", conversation.title)?;
    for message in &conversation.messages {
        writeln!(out, "{}", format_message(message))?;
    }
    Ok(())
}

/// Write a notification line.
///
/// # Errors
/// Returns an error if writing fails.
pub fn render_notification(
    out: &mut impl Write,
    notification: &Notification,
) -> std::io::Result<()> {
    let tag = match notification.severity {
        Severity::Success => "ok",
        Severity::Error => "error",
    };
    writeln!(out, "[{tag}] {}", notification.message)
}

fn render_history(out: &mut impl Write, history: &[HistoryEntry]) -> std::io::Result<()> {
    if history.is_empty() {
        return writeln!(out, "  (agent history is empty)");
    }
    for entry in history {
        writeln!(out, "  {}: {}", entry.role, entry.content)?;
    }
    Ok(())
}

/// Apply one command. Returns `false` when the user asked to quit.
///
/// # Errors
/// Returns an error if writing to `out` fails.
pub async fn handle_command<T: AgentTransport>(
    controller: &mut ChatController<T>,
    command: Command,
    out: &mut (impl Write + Send),
) -> std::io::Result<bool> {
    match command {
        Command::Quit => return Ok(false),
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Invalid(reason) => writeln!(out, "{reason}")?,
        Command::List => render_sidebar(out, controller.store())?,
        Command::New => {
            controller.new_conversation();
            render_sidebar(out, controller.store())?;
        }
        Command::Switch(n) => {
            if let Some(id) = nth_id(controller.store(), n) {
                let selected = controller.select_conversation(id);
                if let Some(conversation) =
                    controller.store().current_conversation().filter(|_| selected)
                {
                    render_transcript(out, conversation)?;
                }
            } else {
                writeln!(out, "no conversation #{n}")?;
            }
        }
        Command::Delete(n) => {
            if let Some(id) = nth_id(controller.store(), n) {
                controller.delete_conversation(id);
                render_sidebar(out, controller.store())?;
            } else {
                writeln!(out, "no conversation #{n}")?;
            }
        }
        Command::Rename(n, title) => {
            if let Some(id) = nth_id(controller.store(), n) {
                controller.rename_conversation(id, &title);
                render_sidebar(out, controller.store())?;
            } else {
                writeln!(out, "no conversation #{n}")?;
            }
        }
        Command::History => {
            if let Some(history) = controller.fetch_history().await {
                render_history(out, &history)?;
            }
        }
        Command::Reset => {
            controller.reset_remote().await;
        }
        Command::Say(text) => {
            if let Ok(pending) = controller.begin_send(&text) {
                if controller.store().is_loading() {
                    writeln!(out, "agent is typing…")?;
                    out.flush()?;
                }
                let result = controller.deliver(&pending).await;
                let replied = controller.finish_send(pending.conversation_id(), result)
                    == SendOutcome::Replied;
                if let Some(reply) = controller
                    .store()
                    .conversation(pending.conversation_id())
                    .and_then(Conversation::last_message)
                    .filter(|_| replied)
                {
                    writeln!(out, "{}", format_message(reply))?;
                }
            }
        }
    }

    if let Some(notification) = controller.active_notification(Instant::now()) {
        render_notification(out, notification)?;
        controller.dismiss_notification();
    }
    Ok(true)
}

fn nth_id(store: &ConversationStore, n: usize) -> Option<crate::chat::ConversationId> {
    store.conversations().get(n.checked_sub(1)?).map(|c| c.id)
}

/// Run the interactive console over stdin/stdout until `/quit` or EOF.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built or the terminal fails.
pub async fn run(config: &ClientConfig) -> anyhow::Result<()> {
    let transport =
        HttpAgentClient::from_config(config).context("failed to build agent client")?;
    let client_id = config
        .client_id
        .as_deref()
        .and_then(ClientId::from_raw)
        .unwrap_or_else(ClientId::generate);
    tracing::info!(client_id = %client_id, api = %transport.base_url(), "console session started");

    let mut controller =
        ChatController::new(transport, client_id).with_notification_ttl(config.notification_ttl());
    controller.on_load();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "Agent Chat. Type /help for commands.")?;
    render_sidebar(&mut stdout, controller.store())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };
        if !handle_command(&mut controller, Command::parse(&line), &mut stdout).await? {
            break;
        }
    }

    tracing::info!("console session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::chat::{ChatError, NewMessage};
    use crate::client::{ClientError, ClientResult};

    struct FixedTransport;

    #[async_trait]
    impl AgentTransport for FixedTransport {
        async fn send_message(&self, content: &str, _client_id: &ClientId) -> ClientResult<String> {
            if content == "fail" {
                Err(ClientError::Api {
                    status: 500,
                    detail: Some("agent offline".to_string()),
                })
            } else {
                Ok(format!("re: {content}"))
            }
        }

        async fn history(&self, _client_id: &ClientId) -> ClientResult<Vec<HistoryEntry>> {
            Ok(Vec::new())
        }

        async fn reset(&self, _client_id: &ClientId) -> ClientResult<String> {
            Ok("Conversation reset successfully".to_string())
        }
    }

    fn controller() -> ChatController<FixedTransport> {
        let mut ctl = ChatController::new(FixedTransport, ClientId::generate());
        ctl.on_load();
        ctl
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("hello there"), Command::Say("hello there".to_string()));
        assert_eq!(Command::parse("/new"), Command::New);
        assert_eq!(Command::parse("  /switch 2 "), Command::Switch(2));
        assert_eq!(Command::parse("/rm 1"), Command::Delete(1));
        assert_eq!(
            Command::parse("/rename 3 Weekend plans"),
            Command::Rename(3, "Weekend plans".to_string())
        );
        assert_eq!(Command::parse("/quit"), Command::Quit);
    }

    #[test]
    fn test_double_slash_sends_literal_slash() {
        assert_eq!(
            Command::parse("//etc/hosts is empty?"),
            Command::Say("/etc/hosts is empty?".to_string())
        );
        assert_eq!(Command::parse("  //new "), Command::Say("/new".to_string()));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(matches!(Command::parse("/switch"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/switch 0"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/delete two"), Command::Invalid(_)));
        assert_eq!(
            Command::parse("/dance"),
            Command::Invalid("unknown command: /dance".to_string())
        );
    }

    #[test]
    fn test_sidebar_marks_current() {
        let mut store = ConversationStore::new();
        store.create_conversation();
        let second = store.create_conversation();
        store.rename_conversation(second, "Second").unwrap();

        let mut buf = Vec::new();
        render_sidebar(&mut buf, &store).unwrap();
        let text = output(buf);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("  1. New Conversation"));
        assert!(lines[1].starts_with("* 2. Second"));
    }

    #[test]
    fn test_format_message_labels_roles() {
        let mut store = ConversationStore::new();
        let cid = store.create_conversation();
        store.add_message(cid, NewMessage::user("hi")).unwrap();
        store.add_message(cid, NewMessage::assistant("hello")).unwrap();

        let conversation = store.conversation(cid).unwrap();
        assert!(format_message(&conversation.messages[0]).ends_with("you: hi"));
        assert!(format_message(&conversation.messages[1]).ends_with("agent: hello"));
    }

    #[tokio::test]
    async fn test_say_prints_reply() {
        let mut ctl = controller();
        let mut buf = Vec::new();

        let keep_going = handle_command(&mut ctl, Command::parse("hi"), &mut buf)
            .await
            .unwrap();
        assert!(keep_going);
        let text = output(buf);
        assert!(text.starts_with("agent is typing…"));
        assert!(text.trim_end().ends_with("agent: re: hi"));
        assert!(!ctl.store().is_loading());
    }

    #[tokio::test]
    async fn test_escaped_slash_reaches_the_agent() {
        let mut ctl = controller();
        let mut buf = Vec::new();

        handle_command(&mut ctl, Command::parse("//etc"), &mut buf)
            .await
            .unwrap();
        assert!(output(buf).trim_end().ends_with("agent: re: /etc"));
    }

    #[tokio::test]
    async fn test_failed_send_prints_notification_once() {
        let mut ctl = controller();
        let mut buf = Vec::new();

        handle_command(&mut ctl, Command::parse("fail"), &mut buf)
            .await
            .unwrap();
        assert!(output(buf).contains("[error] agent offline"));
        assert!(ctl.active_notification(Instant::now()).is_none());
        assert_eq!(ctl.store().error(), Some("agent offline"));
    }

    #[tokio::test]
    async fn test_delete_and_quit() {
        let mut ctl = controller();
        let mut buf = Vec::new();

        handle_command(&mut ctl, Command::Delete(1), &mut buf)
            .await
            .unwrap();
        assert!(ctl.store().conversations().is_empty());
        assert!(output(buf).contains("(no conversations)"));

        let mut buf = Vec::new();
        handle_command(&mut ctl, Command::parse("hi"), &mut buf)
            .await
            .unwrap();
        assert!(!output(buf).contains("agent is typing"));
        assert_eq!(
            ctl.store().error(),
            Some(ChatError::NoActiveConversation.to_string().as_str())
        );

        let mut buf = Vec::new();
        let keep_going = handle_command(&mut ctl, Command::Quit, &mut buf).await.unwrap();
        assert!(!keep_going);
    }

    #[tokio::test]
    async fn test_reset_prints_success() {
        let mut ctl = controller();
        let mut buf = Vec::new();

        handle_command(&mut ctl, Command::Reset, &mut buf).await.unwrap();
        assert!(output(buf).contains("[ok] Conversation reset successfully"));
    }
}
