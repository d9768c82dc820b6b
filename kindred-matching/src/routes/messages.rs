use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::types::api::ApiResponse;
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::pagination::{Paginated, PaginationParams};

use crate::chat::Conversation;
use crate::models::Message;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked: u64,
}

// GET /conversations
pub async fn list_conversations(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Conversation>>>> {
    let conversations = state.engine.chat.conversations(user.id).await?;
    Ok(Json(ApiResponse::ok(conversations)))
}

// GET /messages/unread-count
pub async fn unread_count(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let unread = state.engine.chat.unread_count(user.id).await?;
    Ok(Json(ApiResponse::ok(UnreadCount { unread })))
}

// GET /matches/:id/messages
pub async fn list_messages(
    user: AuthUser,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let messages = state.engine.chat.list_messages(match_id, user.id).await?;
    Ok(Json(ApiResponse::ok(Paginated::from_vec(messages, &params))))
}

// POST /matches/:id/messages
pub async fn send_message(
    user: AuthUser,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Message>>)> {
    let message = state
        .engine
        .chat
        .send_message(match_id, user.id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message))))
}

// POST /matches/:id/read
pub async fn mark_as_read(
    user: AuthUser,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MarkedRead>>> {
    let marked = state.engine.chat.mark_as_read(match_id, user.id).await?;
    Ok(Json(ApiResponse::ok(MarkedRead { marked })))
}
