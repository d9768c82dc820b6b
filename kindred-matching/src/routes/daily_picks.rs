use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::types::api::ApiResponse;
use kindred_shared::types::auth::AuthUser;

use crate::matching::daily_picks::{DailyPickView, PickAction};
use crate::models::SwipeOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PickActionRequest {
    pub action: PickAction,
}

// GET /daily-picks
pub async fn get_daily_picks(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DailyPickView>>> {
    let view = state.engine.daily_picks.get_or_generate(user.id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

// POST /daily-picks/generate
pub async fn regenerate(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DailyPickView>>> {
    let view = state.engine.daily_picks.regenerate(user.id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

// POST /daily-picks/:picked_id/act
pub async fn act_on_pick(
    user: AuthUser,
    State(state): State<AppState>,
    Path(picked_id): Path<Uuid>,
    Json(req): Json<PickActionRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let outcome = state
        .engine
        .daily_picks
        .act_on_pick(user.id, picked_id, req.action)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
