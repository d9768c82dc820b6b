use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::compatibility::are_compatible;
use super::explanation::Explainer;
use super::ledger::SwipeLedger;
use super::retriever::Retriever;
use crate::config::MatchingSettings;
use crate::events::publisher::{self, EventSink};
use crate::models::{
    DailyPick, DailyPickSet, PickStatus, SwipeAction, SwipeOutcome, UserId, UserProfile,
    EMBEDDING_DIM,
};
use crate::providers::{with_resolved_photos, PhotoResolver};
use crate::store::{DailyPickStore, UserStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickAction {
    Like,
    Pass,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyPickWithUser {
    #[serde(flatten)]
    pub pick: DailyPick,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyPickView {
    pub user_id: UserId,
    pub picks: Vec<DailyPickWithUser>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub all_reviewed: bool,
}

/// First instant of the next local calendar day after `now`. If midnight
/// falls in a DST gap, the first valid hour after it is used.
pub fn next_local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let tomorrow = now.date_naive().succ_opt()?;
    let tz = now.timezone();
    (0..=3)
        .find_map(|hour| {
            let local = tomorrow.and_hms_opt(hour, 0, 0)?;
            tz.from_local_datetime(&local).earliest()
        })
        .map(|t| t.with_timezone(&Utc))
}

/// Shared interests in the viewer's order, without repeats.
fn shared_interests(viewer: &UserProfile, candidate: &UserProfile) -> Vec<String> {
    let mut seen = HashSet::new();
    viewer
        .interests
        .iter()
        .filter(|i| candidate.interests.contains(*i) && seen.insert(i.as_str()))
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct DailyPicksService {
    users: Arc<dyn UserStore>,
    picks: Arc<dyn DailyPickStore>,
    swipes: SwipeLedger,
    retriever: Retriever,
    explainer: Explainer,
    photos: Arc<dyn PhotoResolver>,
    events: Arc<dyn EventSink>,
    settings: MatchingSettings,
}

impl DailyPicksService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        picks: Arc<dyn DailyPickStore>,
        swipes: SwipeLedger,
        retriever: Retriever,
        explainer: Explainer,
        photos: Arc<dyn PhotoResolver>,
        events: Arc<dyn EventSink>,
        settings: MatchingSettings,
    ) -> Self {
        Self {
            users,
            picks,
            swipes,
            retriever,
            explainer,
            photos,
            events,
            settings,
        }
    }

    /// The user's unexpired picks, or `None` when they need generating.
    pub async fn current(&self, user_id: UserId) -> AppResult<Option<DailyPickView>> {
        self.current_at(user_id, Utc::now()).await
    }

    pub async fn current_at(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<Option<DailyPickView>> {
        match self.picks.get(user_id).await? {
            Some(set) if !set.is_expired(now) => Ok(Some(self.view(set).await?)),
            _ => Ok(None),
        }
    }

    pub async fn get_or_generate(&self, user_id: UserId) -> AppResult<DailyPickView> {
        if let Some(view) = self.current(user_id).await? {
            return Ok(view);
        }
        self.regenerate(user_id).await
    }

    /// Generate unconditionally and return the view.
    pub async fn regenerate(&self, user_id: UserId) -> AppResult<DailyPickView> {
        let set = self.generate(user_id).await?;
        self.view(set).await
    }

    pub async fn generate(&self, user_id: UserId) -> AppResult<DailyPickSet> {
        self.generate_at(user_id, Local::now()).await
    }

    /// Build and store a fresh set, replacing any previous one. An empty
    /// set is a valid result and is stored like any other.
    pub async fn generate_at<Tz>(&self, user_id: UserId, now: DateTime<Tz>) -> AppResult<DailyPickSet>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Send + Sync,
    {
        let viewer = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        let embedding = viewer
            .embedding
            .as_deref()
            .filter(|e| e.len() == EMBEDDING_DIM)
            .ok_or_else(|| AppError::new(ErrorCode::NoEmbedding, "user has no profile embedding"))?;

        let neighbors = self
            .retriever
            .search(embedding, self.settings.daily_pick_candidates)
            .await?;

        let mut seen = HashSet::new();
        let mut accepted: Vec<(UserProfile, f64)> = Vec::new();
        for neighbor in neighbors {
            if accepted.len() >= self.settings.daily_pick_count {
                break;
            }
            if neighbor.user_id == user_id || !seen.insert(neighbor.user_id) {
                continue;
            }
            let Some(candidate) = self.users.get(neighbor.user_id).await? else {
                continue;
            };
            if !are_compatible(&viewer, &candidate) {
                continue;
            }
            if self.swipes.get_swipe(user_id, candidate.id).await?.is_some() {
                continue;
            }
            accepted.push((candidate, neighbor.score));
        }

        let mut picks = Vec::with_capacity(accepted.len());
        for (candidate, score) in &accepted {
            picks.push(DailyPick {
                picked_user_id: candidate.id,
                score: *score,
                ai_explanation: self.explainer.explain_pick(&viewer, candidate).await,
                shared_interests: shared_interests(&viewer, candidate),
                status: PickStatus::Pending,
            });
        }

        let expires_at = next_local_midnight(&now)
            .ok_or_else(|| AppError::internal("could not compute next local midnight"))?;
        let set = DailyPickSet {
            user_id,
            picks,
            generated_at: now.with_timezone(&Utc),
            expires_at,
        };
        self.picks.replace(&set).await?;

        metrics::counter!("daily_picks_generated_total").increment(1);
        tracing::info!(user_id = %user_id, picks = set.picks.len(), expires_at = %set.expires_at, "daily picks generated");
        publisher::publish_daily_picks_generated(self.events.as_ref(), &set).await;
        Ok(set)
    }

    /// Like or pass on a pick. Writes the swipe first, then moves the pick
    /// out of `Pending`. Repeats are no-ops and never fail.
    pub async fn act_on_pick(
        &self,
        user_id: UserId,
        picked_user_id: UserId,
        action: PickAction,
    ) -> AppResult<SwipeOutcome> {
        let mut set = self
            .picks
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::DailyPicksNotFound, "no daily picks for user"))?;
        if set.pick_mut(picked_user_id).is_none() {
            return Err(AppError::new(ErrorCode::PickNotFound, "user is not in today's picks"));
        }

        let swipe_action = match action {
            PickAction::Like => SwipeAction::Like,
            PickAction::Pass => SwipeAction::Reject,
        };
        let outcome = self
            .swipes
            .record_swipe_lenient(user_id, picked_user_id, swipe_action)
            .await?;

        if let Some(pick) = set.pick_mut(picked_user_id) {
            if pick.status == PickStatus::Pending {
                pick.status = match action {
                    PickAction::Like => PickStatus::Liked,
                    PickAction::Pass => PickStatus::Passed,
                };
                self.picks.replace(&set).await?;
            }
        }

        Ok(match action {
            PickAction::Like => outcome,
            PickAction::Pass => SwipeOutcome::no_match(),
        })
    }

    pub async fn clear(&self, user_id: UserId) -> AppResult<bool> {
        self.picks.delete(user_id).await
    }

    pub async fn clear_all(&self) -> AppResult<u64> {
        let removed = self.picks.delete_all().await?;
        tracing::warn!(removed, "all daily picks cleared");
        Ok(removed)
    }

    async fn view(&self, set: DailyPickSet) -> AppResult<DailyPickView> {
        let all_reviewed = set.all_reviewed();
        let mut picks = Vec::with_capacity(set.picks.len());
        for pick in set.picks {
            let Some(user) = self.users.get(pick.picked_user_id).await? else {
                tracing::debug!(picked_user_id = %pick.picked_user_id, "skipping pick for deleted user");
                continue;
            };
            picks.push(DailyPickWithUser {
                user: with_resolved_photos(self.photos.as_ref(), user).await,
                pick,
            });
        }
        Ok(DailyPickView {
            user_id: set.user_id,
            picks,
            generated_at: set.generated_at,
            expires_at: set.expires_at,
            all_reviewed,
        })
    }
}
