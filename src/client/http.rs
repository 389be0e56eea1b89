//! JSON-over-HTTP client for the agent backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::chat::ClientId;
use crate::config::ClientConfig;

use super::error::{ClientError, ClientResult};
use super::types::{
    HistoryEntry, HistoryResponse, ResetResponse, SendMessageRequest, SendMessageResponse,
};
use super::AgentTransport;

/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Async client for `POST /chat`, `GET /history/{id}` and `POST /reset/{id}`.
#[derive(Clone, Debug)]
pub struct HttpAgentClient {
    client: Client,
    base_url: Url,
}

impl HttpAgentClient {
    /// Create a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    /// Base URL this client talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl AgentTransport for HttpAgentClient {
    async fn send_message(&self, content: &str, client_id: &ClientId) -> ClientResult<String> {
        let url = self.endpoint(&["chat"])?;
        let request = SendMessageRequest {
            content: content.to_string(),
            client_id: client_id.to_string(),
        };
        debug!(%url, client_id = %client_id, "sending message");

        let response = self.client.post(url).json(&request).send().await?;
        let body: SendMessageResponse = decode(response).await?;
        Ok(body.response)
    }

    async fn history(&self, client_id: &ClientId) -> ClientResult<Vec<HistoryEntry>> {
        let url = self.endpoint(&["history", client_id.as_str()])?;
        let response = self.client.get(url).send().await?;
        let body: HistoryResponse = decode(response).await?;
        Ok(body.history)
    }

    async fn reset(&self, client_id: &ClientId) -> ClientResult<String> {
        let url = self.endpoint(&["reset", client_id.as_str()])?;
        let response = self.client.post(url).send().await?;
        let body: ResetResponse = decode(response).await?;
        Ok(body.message)
    }
}

/// Decode a success body, or turn an error status into `ClientError::Api`.
async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let detail = extract_detail(&text);
        warn!(status = status.as_u16(), detail = ?detail, "agent backend returned an error");
        return Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        });
    }

    Ok(serde_json::from_str(&text)?)
}

/// Pull the `detail` field out of an error body.
///
/// Non-string details (validation error lists) are kept as compact JSON.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::chat::Role;
    use crate::llm::{LlmError, LlmResult, ReplyGenerator};
    use crate::server::{AppState, create_router};

    struct EchoGenerator;

    #[async_trait]
    impl ReplyGenerator for EchoGenerator {
        async fn generate(&self, history: &[HistoryEntry]) -> LlmResult<String> {
            let last = history.last().map(|e| e.content.clone()).unwrap_or_default();
            Ok(format!("echo: {last}"))
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl ReplyGenerator for BrokenGenerator {
        async fn generate(&self, _history: &[HistoryEntry]) -> LlmResult<String> {
            Err(LlmError::EmptyReply)
        }
    }

    async fn spawn_backend(generator: Arc<dyn ReplyGenerator>) -> String {
        let app = create_router(AppState::new(generator));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_extract_detail_variants() {
        assert_eq!(
            extract_detail(r#"{"detail":"boom"}"#),
            Some("boom".to_string())
        );
        assert_eq!(
            extract_detail(r#"{"detail":[{"loc":["body"]}]}"#),
            Some(r#"[{"loc":["body"]}]"#.to_string())
        );
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"other":1}"#), None);
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let client =
            HttpAgentClient::new("http://localhost:8000/api/", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(&["history", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/history/a%20b");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = HttpAgentClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_send_history_and_reset_against_backend() {
        let base = spawn_backend(Arc::new(EchoGenerator)).await;
        let client = HttpAgentClient::new(&base, Duration::from_secs(5)).unwrap();
        let client_id = ClientId::generate();

        let reply = client.send_message("hi", &client_id).await.unwrap();
        assert_eq!(reply, "echo: hi");

        let history = client.history(&client_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "echo: hi");

        let status = client.reset(&client_id).await.unwrap();
        assert_eq!(status, "Conversation reset successfully");
        assert!(client.history(&client_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_detail() {
        let base = spawn_backend(Arc::new(BrokenGenerator)).await;
        let client = HttpAgentClient::new(&base, Duration::from_secs(5)).unwrap();

        let err = client
            .send_message("hi", &ClientId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        assert_eq!(err.user_message(), LlmError::EmptyReply.to_string());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpAgentClient::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = client
            .send_message("hi", &ClientId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert!(!err.user_message().is_empty());
    }
}
