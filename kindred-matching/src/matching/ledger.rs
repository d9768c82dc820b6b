use std::sync::Arc;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::compatibility::are_compatible;
use super::explanation::Explainer;
use crate::demo::{self, SeededLikes};
use crate::events::publisher::{self, EventSink};
use crate::models::{Match, MatchId, Swipe, SwipeAction, SwipeOutcome, UserId};
use crate::store::{CascadeCounts, LedgerStore, MatchSide, SwipeWrite, UserStore};

/// Swipe recording and mutual-match detection.
#[derive(Clone)]
pub struct SwipeLedger {
    store: Arc<dyn LedgerStore>,
    users: Arc<dyn UserStore>,
    events: Arc<dyn EventSink>,
    explainer: Explainer,
}

impl SwipeLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventSink>,
        explainer: Explainer,
    ) -> Self {
        Self {
            store,
            users,
            events,
            explainer,
        }
    }

    /// User-initiated swipe. A second swipe on the same profile is an error.
    pub async fn record_swipe(
        &self,
        swiper: UserId,
        swiped: UserId,
        action: SwipeAction,
    ) -> AppResult<SwipeOutcome> {
        if swiper == swiped {
            return Err(AppError::new(ErrorCode::CannotSwipeSelf, "cannot swipe on yourself"));
        }
        if self.users.get(swiped).await?.is_none() {
            return Err(AppError::new(ErrorCode::UserNotFound, "swiped user not found"));
        }

        match self.store.record_swipe(swiper, swiped, action).await? {
            SwipeWrite::Recorded { outcome, match_created } => {
                self.after_write(swiper, swiped, action, outcome, match_created).await;
                Ok(outcome)
            }
            SwipeWrite::Duplicate(existing) => Err(AppError::with_details(
                ErrorCode::DuplicateSwipe,
                "already swiped on this user",
                serde_json::json!({ "action": existing.action, "swiped_at": existing.created_at }),
            )),
        }
    }

    /// Swipe on behalf of an automated flow. A repeat is a no-op that
    /// reports the pair's current match state.
    pub async fn record_swipe_lenient(
        &self,
        swiper: UserId,
        swiped: UserId,
        action: SwipeAction,
    ) -> AppResult<SwipeOutcome> {
        if swiper == swiped {
            return Err(AppError::new(ErrorCode::CannotSwipeSelf, "cannot swipe on yourself"));
        }

        match self.store.record_swipe(swiper, swiped, action).await? {
            SwipeWrite::Recorded { outcome, match_created } => {
                self.after_write(swiper, swiped, action, outcome, match_created).await;
                Ok(outcome)
            }
            SwipeWrite::Duplicate(_) => Ok(self
                .store
                .find_match(swiper, swiped)
                .await?
                .map(|m| SwipeOutcome::matched(m.id))
                .unwrap_or_default()),
        }
    }

    async fn after_write(
        &self,
        swiper: UserId,
        swiped: UserId,
        action: SwipeAction,
        outcome: SwipeOutcome,
        match_created: bool,
    ) {
        metrics::counter!("swipes_recorded_total", "action" => action.as_str()).increment(1);
        tracing::info!(swiper_id = %swiper, swiped_id = %swiped, action = action.as_str(), matched = outcome.matched, "swipe recorded");
        publisher::publish_swipe_recorded(self.events.as_ref(), swiper, swiped, action).await;

        // A pair re-liking after a swipe reset lands on its existing match.
        let Some(match_id) = outcome.match_id.filter(|_| match_created) else {
            return;
        };
        metrics::counter!("matches_created_total").increment(1);
        publisher::publish_match_created(self.events.as_ref(), match_id, swiper, swiped).await;

        let explainer = self.explainer.clone();
        tokio::spawn(async move {
            if let Err(e) = explainer.generate_match_explanation(match_id).await {
                tracing::warn!(match_id = %match_id, error = %e, "background match explanation failed");
            }
        });
    }

    pub async fn get_swipe(&self, swiper: UserId, swiped: UserId) -> AppResult<Option<Swipe>> {
        self.store.get_swipe(swiper, swiped).await
    }

    pub async fn check_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>> {
        self.store.find_match(a, b).await
    }

    /// Matches on either side, newest first.
    pub async fn all_matches_for_user(&self, user: UserId) -> AppResult<Vec<Match>> {
        let mut all = self.store.matches_as(user, MatchSide::First).await?;
        all.extend(self.store.matches_as(user, MatchSide::Second).await?);
        all.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        all.dedup_by_key(|m| m.id);
        Ok(all)
    }

    pub async fn get_match(&self, id: MatchId) -> AppResult<Option<Match>> {
        self.store.get_match(id).await
    }

    pub async fn likes_received(&self, user: UserId) -> AppResult<Vec<Swipe>> {
        self.store.likes_received(user).await
    }

    pub async fn delete_user(&self, user: UserId) -> AppResult<CascadeCounts> {
        self.store.delete_user(user).await
    }

    /// Have compatible demo accounts like `target`, at most `like_count` of
    /// them. Existing swipes are left as they are.
    pub async fn seed_demo_likes(&self, target: UserId, like_count: Option<usize>) -> AppResult<SeededLikes> {
        let target = self
            .users
            .get(target)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "target user not found"))?;
        let demo_users = demo::demo_users(self.users.as_ref()).await?;
        if demo_users.is_empty() {
            return Err(AppError::not_found("no demo users; seed demo profiles first"));
        }

        let admirers: Vec<_> = demo_users
            .into_iter()
            .filter(|d| d.id != target.id && are_compatible(d, &target))
            .collect();
        let limit = like_count.unwrap_or(admirers.len());

        let mut seeded = SeededLikes {
            target_name: target.name.clone(),
            ..SeededLikes::default()
        };
        for admirer in admirers.into_iter().take(limit) {
            self.record_swipe_lenient(admirer.id, target.id, SwipeAction::Like).await?;
            seeded.likes_created += 1;
            seeded.liked_by.push(admirer.name);
        }
        tracing::info!(target_id = %target.id, likes = seeded.likes_created, "demo likes seeded");
        Ok(seeded)
    }

    pub async fn delete_all_swipes(&self) -> AppResult<u64> {
        let removed = self.store.delete_all_swipes().await?;
        tracing::warn!(removed, "all swipes deleted");
        Ok(removed)
    }
}
