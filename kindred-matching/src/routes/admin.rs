use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::middleware::AdminUser;
use kindred_shared::types::api::ApiResponse;

use crate::demo::{DemoCleanup, DemoSeedSummary, SeededLikes};
use crate::profiles::DeletionSummary;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClearPicksQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SeedLikesRequest {
    pub user_id: Uuid,
    pub like_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: u64,
}

// DELETE /admin/users/:id
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletionSummary>>> {
    tracing::info!(admin_id = %admin.id, %user_id, "admin cascade delete");
    let summary = state.engine.profiles.delete_user(user_id).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

// DELETE /admin/swipes
pub async fn delete_all_swipes(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    tracing::info!(admin_id = %admin.id, "admin swipe reset");
    let removed = state.engine.swipes.delete_all_swipes().await?;
    Ok(Json(ApiResponse::ok(Removed { removed })))
}

// DELETE /admin/daily-picks
pub async fn clear_daily_picks(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ClearPicksQuery>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    let picks = &state.engine.daily_picks;
    let removed = match query.user_id {
        Some(user_id) => u64::from(picks.clear(user_id).await?),
        None => picks.clear_all().await?,
    };
    tracing::info!(admin_id = %admin.id, user_id = ?query.user_id, removed, "admin cleared daily picks");
    Ok(Json(ApiResponse::ok(Removed { removed })))
}

// POST /admin/demo/profiles
pub async fn seed_demo_profiles(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<ApiResponse<DemoSeedSummary>>)> {
    tracing::info!(admin_id = %admin.id, "admin seeding demo profiles");
    let summary = state.engine.profiles.seed_demo_profiles().await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(summary))))
}

// DELETE /admin/demo/profiles
pub async fn clear_demo_profiles(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DemoCleanup>>> {
    tracing::info!(admin_id = %admin.id, "admin clearing demo profiles");
    let cleanup = state.engine.profiles.clear_demo_profiles().await?;
    Ok(Json(ApiResponse::ok(cleanup)))
}

// POST /admin/demo/likes
pub async fn seed_demo_likes(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<SeedLikesRequest>,
) -> AppResult<Json<ApiResponse<SeededLikes>>> {
    tracing::info!(admin_id = %admin.id, target_id = %req.user_id, like_count = ?req.like_count, "admin seeding demo likes");
    let seeded = state.engine.swipes.seed_demo_likes(req.user_id, req.like_count).await?;
    Ok(Json(ApiResponse::ok(seeded)))
}
