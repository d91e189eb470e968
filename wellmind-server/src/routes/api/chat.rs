use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::error;
use utoipa::OpenApi;

use crate::entities::ChatStore;
use crate::error::ServerError;
use crate::schemas::api::chat::{ChatRequest, ChatResponse, HistoryEntry};
use crate::services::{ConversationPipeline, PipelineError, ReplySource};
use crate::state::AppState;

/// Most turns returned by the history endpoint.
const HISTORY_LIMIT: i64 = 100;

#[derive(OpenApi)]
#[openapi(
    paths(chat, chat_history),
    components(schemas(ChatRequest, ChatResponse, HistoryEntry, ReplySource))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/history/{session_id}", get(chat_history))
}

/// Run one chat turn.
///
/// Store failures after validation still answer 200 with a generic
/// supportive reply (`source = error_fallback`).
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty or malformed message"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let Json(req) = payload?;
    run_turn(&*state.pipeline, req).await.map(Json)
}

async fn run_turn<S: ChatStore>(
    pipeline: &ConversationPipeline<S>,
    req: ChatRequest,
) -> Result<ChatResponse, ServerError> {
    let session_id = req.session_id.filter(|s| !s.trim().is_empty());

    match pipeline.handle_turn(&req.message, session_id.clone()).await {
        Ok(outcome) => Ok(outcome.to_response()),
        Err(PipelineError::InvalidInput) => {
            Err(ServerError::BadRequest("Message cannot be empty".into()))
        }
        Err(e @ PipelineError::Persistence { .. }) => {
            error!(error = %e, "chat turn failed; answering with error fallback");
            Ok(pipeline.error_fallback(session_id).to_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/chat/history/{session_id}",
    tag = "chat",
    params(("session_id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Turns, oldest first", body = Vec<HistoryEntry>),
        (status = 500, description = "Store error"),
    )
)]
pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ServerError> {
    let messages = state.store.list_messages(&session_id, HISTORY_LIMIT).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}
