//! Ollama chat client used by the relay server.
//!
//! Sends the whole per-client history to `POST /api/chat` with streaming
//! disabled and returns the assistant message text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::HistoryEntry;
use crate::config::ServerConfig;

use super::{LlmError, LlmResult, ReplyGenerator};

/// Keep the model loaded in memory between requests.
const KEEP_ALIVE: &str = "1h";

/// HTTP I/O timeouts.
const IO_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP client timeout for long-running generations.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    stream: bool,
    keep_alive: &'a str,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

/// Async Ollama client for chat completions.
pub struct OllamaChat {
    client: Client,
    chat_url: Url,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OllamaChat {
    /// Create a client from server configuration.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> LlmResult<Self> {
        let chat_url = Url::parse(&config.ollama_url)?.join("/api/chat")?;
        let client = Client::builder()
            .connect_timeout(IO_TIMEOUT)
            .timeout(CLIENT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            chat_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request<'a>(&'a self, history: &'a [HistoryEntry]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|entry| ChatTurn {
                    role: entry.role.as_str(),
                    content: &entry.content,
                })
                .collect(),
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl ReplyGenerator for OllamaChat {
    async fn generate(&self, history: &[HistoryEntry]) -> LlmResult<String> {
        let request = self.build_request(history);
        debug!(model = %self.model, turns = history.len(), "requesting completion");

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::HttpStatusNotOk(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        body.message
            .and_then(|m| m.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn serve_stub(app: Router) -> OllamaChat {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let config = ServerConfig {
            ollama_url: format!("http://{addr}"),
            ..ServerConfig::default()
        };
        OllamaChat::from_config(&config).unwrap()
    }

    #[test]
    fn test_chat_url_is_derived_from_base() {
        let config = ServerConfig {
            ollama_url: "http://gpu-box:11434".to_string(),
            ..ServerConfig::default()
        };
        let client = OllamaChat::from_config(&config).unwrap();
        assert_eq!(client.chat_url.as_str(), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn test_request_carries_history_and_options() {
        let config = ServerConfig {
            model: "mistral".to_string(),
            max_tokens: 64,
            ..ServerConfig::default()
        };
        let client = OllamaChat::from_config(&config).unwrap();
        let history = vec![HistoryEntry::user("hi"), HistoryEntry::assistant("hello")];

        let json = serde_json::to_value(client.build_request(&history)).unwrap();
        assert_eq!(json["model"], "mistral");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["options"]["num_predict"], 64);
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let app = Router::new().route(
            "/api/chat",
            post(|Json(request): Json<Value>| async move {
                let turns = request["messages"].as_array().map_or(0, Vec::len);
                Json(json!({
                    "message": { "role": "assistant", "content": format!("{turns} turns") },
                    "done": true
                }))
            }),
        );
        let ollama = serve_stub(app).await;

        let history = vec![
            HistoryEntry::user("hi"),
            HistoryEntry::assistant("hello"),
            HistoryEntry::user("again"),
        ];
        assert_eq!(ollama.generate(&history).await.unwrap(), "3 turns");
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_reply() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                Json(json!({ "message": { "role": "assistant", "content": "  " } }))
            }),
        );
        let ollama = serve_stub(app).await;

        let result = ollama.generate(&[HistoryEntry::user("hi")]).await;
        assert!(matches!(result, Err(LlmError::EmptyReply)));
    }

    #[tokio::test]
    async fn test_generate_maps_error_status() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let ollama = serve_stub(app).await;

        let result = ollama.generate(&[HistoryEntry::user("hi")]).await;
        assert!(matches!(result, Err(LlmError::HttpStatusNotOk(503))));
    }
}
