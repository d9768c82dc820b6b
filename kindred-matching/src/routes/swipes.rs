use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::types::api::ApiResponse;
use kindred_shared::types::auth::AuthUser;

use crate::matches::LikeReceived;
use crate::models::{SwipeAction, SwipeOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub swiped_id: Uuid,
    pub action: SwipeAction,
}

// POST /swipes
pub async fn record_swipe(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let outcome = state
        .engine
        .swipes
        .record_swipe(user.id, req.swiped_id, req.action)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

// GET /likes/received
pub async fn likes_received(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<LikeReceived>>>> {
    let likes = state.engine.matches.likes_received(user.id).await?;
    Ok(Json(ApiResponse::ok(likes)))
}
