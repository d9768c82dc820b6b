use axum::extract::State;
use axum::Json;

use kindred_shared::errors::AppResult;
use kindred_shared::types::api::ApiResponse;
use kindred_shared::types::auth::AuthUser;

use crate::matching::feed::FeedCandidate;
use crate::AppState;

pub async fn get_feed(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<FeedCandidate>>>> {
    let feed = state.engine.feed.feed_for(user.id).await?;
    Ok(Json(ApiResponse::ok(feed)))
}
