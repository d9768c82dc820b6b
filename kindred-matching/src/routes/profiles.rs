use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::types::api::ApiResponse;
use kindred_shared::types::auth::AuthUser;

use crate::models::UserProfile;
use crate::profiles::{NewProfile, ProfilePatch};
use crate::AppState;

// POST /profiles
pub async fn create_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<NewProfile>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    let profile = state.engine.profiles.create_profile(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

// GET /me
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.engine.profiles.get_profile(user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// PATCH /me
pub async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ProfilePatch>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.engine.profiles.update_profile(user.id, req).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// GET /users/:id
pub async fn get_user(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.engine.profiles.get_profile(id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}
