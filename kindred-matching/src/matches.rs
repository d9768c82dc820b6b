use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::matching::ledger::SwipeLedger;
use crate::models::{Match, MatchId, UserId, UserProfile};
use crate::providers::{with_resolved_photos, PhotoResolver};
use crate::store::UserStore;

/// A match as seen by one of its participants.
#[derive(Debug, Clone, Serialize)]
pub struct MatchWithUser {
    pub id: MatchId,
    pub matched_at: DateTime<Utc>,
    pub ai_explanation: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchWithUsers {
    #[serde(flatten)]
    pub record: Match,
    pub user1: UserProfile,
    pub user2: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeReceived {
    pub liked_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Read side of the ledger joined with profiles.
#[derive(Clone)]
pub struct MatchService {
    ledger: SwipeLedger,
    users: Arc<dyn UserStore>,
    photos: Arc<dyn PhotoResolver>,
}

impl MatchService {
    pub fn new(ledger: SwipeLedger, users: Arc<dyn UserStore>, photos: Arc<dyn PhotoResolver>) -> Self {
        Self { ledger, users, photos }
    }

    async fn resolved(&self, id: UserId) -> AppResult<Option<UserProfile>> {
        match self.users.get(id).await? {
            Some(p) => Ok(Some(with_resolved_photos(self.photos.as_ref(), p).await)),
            None => Ok(None),
        }
    }

    /// Newest first. Matches whose other participant no longer exists are
    /// skipped.
    pub async fn matches_for(&self, user: UserId) -> AppResult<Vec<MatchWithUser>> {
        let mut out = Vec::new();
        for m in self.ledger.all_matches_for_user(user).await? {
            let Some(other) = m.other_user(user) else { continue };
            let Some(profile) = self.resolved(other).await? else {
                tracing::debug!(match_id = %m.id, %other, "match partner missing");
                continue;
            };
            out.push(MatchWithUser {
                id: m.id,
                matched_at: m.matched_at,
                ai_explanation: m.ai_explanation,
                user: profile,
            });
        }
        Ok(out)
    }

    /// Match with both profiles. Only participants may view it.
    pub async fn match_with_users(&self, match_id: MatchId, viewer: UserId) -> AppResult<MatchWithUsers> {
        let record = self
            .ledger
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
        if !record.involves(viewer) {
            return Err(AppError::new(ErrorCode::NotMatchParticipant, "not a participant of this match"));
        }
        let missing = || AppError::new(ErrorCode::UserNotFound, "match participant not found");
        let user1 = self.resolved(record.user1_id).await?.ok_or_else(missing)?;
        let user2 = self.resolved(record.user2_id).await?.ok_or_else(missing)?;
        Ok(MatchWithUsers { record, user1, user2 })
    }

    pub async fn likes_received(&self, user: UserId) -> AppResult<Vec<LikeReceived>> {
        let mut out = Vec::new();
        for swipe in self.ledger.likes_received(user).await? {
            if let Some(profile) = self.resolved(swipe.swiper_id).await? {
                out.push(LikeReceived {
                    liked_at: swipe.created_at,
                    user: profile,
                });
            }
        }
        Ok(out)
    }
}
