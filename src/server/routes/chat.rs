use axum::extract::State;
use axum::routing::post;
use axum::{ Json, Router };
use serde::Deserialize;

use crate::chat::ChatReply;
use crate::models::ChatMessage;
use crate::server::error::ApiError;
use crate::server::extract::{ ApiJson, Caller };
use crate::server::AppState;

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    message: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chat/start", post(start_session))
        .route("/api/chat/messages", post(send_message).get(message_history))
}

async fn start_session(
    State(state): State<AppState>,
    Caller(identity): Caller
) -> Result<Json<ChatReply>, ApiError> {
    Ok(Json(state.chat.start(&identity.user_id).await?))
}

async fn send_message(
    State(state): State<AppState>,
    Caller(identity): Caller,
    ApiJson(req): ApiJson<SendMessageRequest>
) -> Result<Json<ChatReply>, ApiError> {
    let text = req.message.unwrap_or_default();
    Ok(Json(state.chat.send(&identity.user_id, &text).await?))
}

async fn message_history(
    State(state): State<AppState>,
    Caller(identity): Caller
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.chat.history(&identity.user_id).await?))
}
