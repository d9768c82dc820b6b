pub mod admin;
pub mod daily_picks;
pub mod feed;
pub mod health;
pub mod matches;
pub mod messages;
pub mod profiles;
pub mod swipes;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::AppState;

/// All service routes. Middleware layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::render_metrics))
        // Profiles
        .route("/profiles", post(profiles::create_profile))
        .route("/me", get(profiles::get_me).patch(profiles::update_me))
        .route("/users/:id", get(profiles::get_user))
        // Feed and swipes
        .route("/feed", get(feed::get_feed))
        .route("/swipes", post(swipes::record_swipe))
        .route("/likes/received", get(swipes::likes_received))
        // Matches
        .route("/matches", get(matches::list_matches))
        .route("/matches/check/:user_id", get(matches::check_match))
        .route("/matches/:id", get(matches::get_match))
        .route("/matches/:id/explanation", post(matches::generate_explanation))
        // Daily picks
        .route("/daily-picks", get(daily_picks::get_daily_picks))
        .route("/daily-picks/generate", post(daily_picks::regenerate))
        .route("/daily-picks/:picked_id/act", post(daily_picks::act_on_pick))
        // Messaging
        .route("/conversations", get(messages::list_conversations))
        .route("/messages/unread-count", get(messages::unread_count))
        .route(
            "/matches/:id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/matches/:id/read", post(messages::mark_as_read))
        // Admin
        .route("/admin/users/:id", delete(admin::delete_user))
        .route("/admin/swipes", delete(admin::delete_all_swipes))
        .route("/admin/daily-picks", delete(admin::clear_daily_picks))
        .route(
            "/admin/demo/profiles",
            post(admin::seed_demo_profiles).delete(admin::clear_demo_profiles),
        )
        .route("/admin/demo/likes", post(admin::seed_demo_likes))
        .with_state(state)
}
