use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::api::ApiResponse;
use kindred_shared::types::auth::{AuthUser, UserRole};

use crate::matches::{MatchWithUser, MatchWithUsers};
use crate::models::MatchId;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MatchCheck {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
}

#[derive(Debug, Serialize)]
pub struct ExplanationResponse {
    pub match_id: MatchId,
    pub explanation: String,
}

// GET /matches
pub async fn list_matches(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<MatchWithUser>>>> {
    let matches = state.engine.matches.matches_for(user.id).await?;
    Ok(Json(ApiResponse::ok(matches)))
}

// GET /matches/check/:user_id
pub async fn check_match(
    user: AuthUser,
    State(state): State<AppState>,
    Path(other): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchCheck>>> {
    let found = state.engine.swipes.check_match(user.id, other).await?;
    Ok(Json(ApiResponse::ok(MatchCheck {
        matched: found.is_some(),
        match_id: found.map(|m| m.id),
    })))
}

// GET /matches/:id
pub async fn get_match(
    user: AuthUser,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchWithUsers>>> {
    let m = state.engine.matches.match_with_users(match_id, user.id).await?;
    Ok(Json(ApiResponse::ok(m)))
}

// POST /matches/:id/explanation
pub async fn generate_explanation(
    user: AuthUser,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ExplanationResponse>>> {
    let m = state
        .engine
        .swipes
        .get_match(match_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
    if !m.involves(user.id) && user.role != UserRole::Admin {
        return Err(AppError::new(ErrorCode::NotMatchParticipant, "not a participant of this match"));
    }
    let explanation = state.engine.explainer.generate_match_explanation(match_id).await?;
    Ok(Json(ApiResponse::ok(ExplanationResponse { match_id, explanation })))
}
