use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use pfagent::context::RequestContext;
use pfagent::models::message::Message;
use pfagent::session::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageRequest {
    pub message: String,
    #[serde(default)]
    pub login_cert: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionReply {
    response: Value,
    messages: Vec<ChatMessage>,
}

/// Request context whose token is cancelled when the handler is dropped
fn request_context(login_cert: Option<String>) -> (RequestContext, tokio_util::sync::DropGuard) {
    let cancel = CancellationToken::new();
    let ctx = RequestContext::new(login_cert).with_cancellation(cancel.clone());
    (ctx, cancel.drop_guard())
}

async fn start_chat(State(state): State<AppState>) -> Json<Value> {
    let session = state.sessions.create(state.factory.build()).await;
    Json(json!({ "session_id": session.id() }))
}

/// One-off exchange without a session
async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let (ctx, _guard) = request_context(request.login_cert);
    let agent = state.factory.build();
    let messages = vec![Message::user().with_text(request.message)];

    let result = agent.reply(&messages, &ctx, state.tools_enabled).await?;
    Ok(Json(json!({ "response": result.reply })))
}

async fn send_session_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<SessionReply>, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(ApiError::SessionNotFound)?;
    let (ctx, _guard) = request_context(request.login_cert);

    let (reply, messages) = session
        .send(&request.message, &ctx, state.tools_enabled)
        .await?;
    Ok(Json(SessionReply {
        response: reply.to_value(),
        messages,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(ApiError::SessionNotFound)?;
    Ok(Json(json!({ "messages": session.history().await })))
}

async fn end_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.sessions.remove(&session_id).await {
        return Err(ApiError::SessionNotFound);
    }
    Ok(Json(json!({ "status": "success" })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat/start", get(start_chat))
        .route("/chat/message", post(send_message))
        .route("/chat/:session_id/message", post(send_session_message))
        .route("/chat/:session_id/history", get(get_history))
        .route("/chat/:session_id", delete(end_chat))
        .with_state(state)
}
