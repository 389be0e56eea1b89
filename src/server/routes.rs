//! HTTP route handlers for the agent relay API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::client::{
    ErrorBody, HistoryEntry, HistoryResponse, ResetResponse, SendMessageRequest,
    SendMessageResponse,
};

use super::state::AppState;

/// Error response carrying a `detail` body.
type ApiError = (StatusCode, Json<ErrorBody>);

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/history/{client_id}", get(history))
        .route("/reset/{client_id}", post(reset))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Agent Chat API is running" }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "agent-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Record the user turn, generate a reply from the full history, record it.
///
/// The history lock is not held across generation. Two overlapping requests
/// for the same client can therefore record `u1, u2, a2, a1`; clients are
/// expected to wait for each reply before sending again.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let history = state.append(&request.client_id, HistoryEntry::user(request.content));

    let response = state.generator.generate(&history).await.map_err(|e| {
        warn!(client_id = %request.client_id, error = %e, "reply generation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                detail: e.to_string(),
            }),
        )
    })?;

    state.append(&request.client_id, HistoryEntry::assistant(response.clone()));
    info!(client_id = %request.client_id, turns = history.len() + 1, "replied");

    Ok(Json(SendMessageResponse { response }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.history(&client_id),
    })
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Json<ResetResponse> {
    state.reset(&client_id);
    info!(client_id = %client_id, "history reset");
    Json(ResetResponse {
        message: "Conversation reset successfully".to_string(),
    })
}
