use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::demo::{self, DemoCleanup, DemoSeedSummary};
use crate::events::publisher::{self, EventSink};
use crate::matching::ledger::SwipeLedger;
use crate::matching::retriever::build_profile_text;
use crate::models::{
    age_on, parse_looking_for, AgeRange, Gender, Location, UserId, UserProfile, EMBEDDING_DIM,
    MAX_AGE, MIN_AGE,
};
use crate::providers::{with_resolved_photos, EmbeddingProvider, EmbeddingRefresher, PhotoResolver};
use crate::store::{DailyPickStore, MessageStore, UserStore};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProfile {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub bio: String,
    #[validate(length(min = 1))]
    pub looking_for: Vec<String>,
    pub age_min: u32,
    pub age_max: u32,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub interests: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 9))]
    pub photos: Vec<String>,
    pub location: Option<Location>,
    #[validate(range(min = 0.0))]
    pub max_distance: Option<f64>,
}

/// Partial update. Absent fields are left untouched; `max_distance: 0`
/// removes the distance limit.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    pub looking_for: Option<Vec<String>>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    #[validate(length(max = 30))]
    pub interests: Option<Vec<String>>,
    #[validate(length(max = 9))]
    pub photos: Option<Vec<String>>,
    pub location: Option<Location>,
    #[validate(range(min = 0.0))]
    pub max_distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub swipes_deleted: u64,
    pub matches_deleted: u64,
    pub messages_deleted: u64,
    pub daily_picks_deleted: bool,
}

fn validated_age(dob: NaiveDate) -> AppResult<u32> {
    let age = age_on(dob, Local::now().date_naive());
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(AppError::new(
            ErrorCode::InvalidProfile,
            format!("age must be between {MIN_AGE} and {MAX_AGE}"),
        ));
    }
    Ok(age)
}

fn clean_interests(interests: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(interests.len());
    for interest in interests {
        let interest = interest.trim().to_string();
        if !interest.is_empty() && !out.contains(&interest) {
            out.push(interest);
        }
    }
    out
}

fn invalid(e: validator::ValidationErrors) -> AppError {
    AppError::Validation(e.to_string())
}

/// Profile lifecycle: creation with a required embedding, edits that
/// queue re-embedding, and the cascading delete.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserStore>,
    ledger: SwipeLedger,
    messages: Arc<dyn MessageStore>,
    picks: Arc<dyn DailyPickStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    refresher: Arc<dyn EmbeddingRefresher>,
    photos: Arc<dyn PhotoResolver>,
    events: Arc<dyn EventSink>,
}

impl ProfileService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        ledger: SwipeLedger,
        messages: Arc<dyn MessageStore>,
        picks: Arc<dyn DailyPickStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        refresher: Arc<dyn EmbeddingRefresher>,
        photos: Arc<dyn PhotoResolver>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            users,
            ledger,
            messages,
            picks,
            embedder,
            refresher,
            photos,
            events,
        }
    }

    /// Create the profile for `id`. The embedding is generated inline; a
    /// provider failure aborts creation.
    pub async fn create_profile(&self, id: UserId, input: NewProfile) -> AppResult<UserProfile> {
        self.insert_profile(id, input, false).await
    }

    async fn insert_profile(&self, id: UserId, input: NewProfile, is_demo: bool) -> AppResult<UserProfile> {
        input.validate().map_err(invalid)?;
        let gender: Gender = input.gender.parse()?;
        let looking_for = parse_looking_for(&input.looking_for)?;
        let age_range = AgeRange::new(input.age_min, input.age_max)?;
        let age = validated_age(input.date_of_birth)?;

        if self.users.get(id).await?.is_some() {
            return Err(AppError::new(ErrorCode::InvalidProfile, "profile already exists"));
        }

        let interests = clean_interests(input.interests);
        let bio = input.bio.trim().to_string();
        let embedding = self.embedder.embed(&build_profile_text(&bio, &interests)).await?;
        if embedding.len() != EMBEDDING_DIM {
            return Err(AppError::provider(format!(
                "embedding has {} dimensions, expected {EMBEDDING_DIM}",
                embedding.len()
            )));
        }

        let now = Utc::now();
        let profile = UserProfile {
            id,
            name: input.name.trim().to_string(),
            date_of_birth: Some(input.date_of_birth),
            age,
            gender,
            bio,
            looking_for,
            age_range,
            interests,
            photos: input.photos,
            location: input.location,
            max_distance: input.max_distance.filter(|d| *d > 0.0),
            is_demo,
            embedding: Some(embedding),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&profile).await?;

        tracing::info!(user_id = %id, is_demo, "profile created");
        publisher::publish_profile_updated(self.events.as_ref(), id, false).await;
        Ok(with_resolved_photos(self.photos.as_ref(), profile).await)
    }

    pub async fn update_profile(&self, id: UserId, patch: ProfilePatch) -> AppResult<UserProfile> {
        patch.validate().map_err(invalid)?;
        let mut profile = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

        let mut text_changed = false;
        if let Some(name) = patch.name {
            profile.name = name.trim().to_string();
        }
        if let Some(dob) = patch.date_of_birth {
            profile.age = validated_age(dob)?;
            profile.date_of_birth = Some(dob);
        }
        if let Some(gender) = patch.gender {
            profile.gender = gender.parse()?;
        }
        if let Some(bio) = patch.bio {
            let bio = bio.trim().to_string();
            text_changed |= bio != profile.bio;
            profile.bio = bio;
        }
        if let Some(tags) = patch.looking_for {
            profile.looking_for = parse_looking_for(&tags)?;
        }
        if patch.age_min.is_some() || patch.age_max.is_some() {
            profile.age_range = AgeRange::new(
                patch.age_min.unwrap_or(profile.age_range.min),
                patch.age_max.unwrap_or(profile.age_range.max),
            )?;
        }
        if let Some(interests) = patch.interests {
            let interests = clean_interests(interests);
            text_changed |= interests != profile.interests;
            profile.interests = interests;
        }
        if let Some(photos) = patch.photos {
            profile.photos = photos;
        }
        if let Some(location) = patch.location {
            profile.location = Some(location);
        }
        if let Some(max) = patch.max_distance {
            profile.max_distance = (max > 0.0).then_some(max);
        }
        profile.updated_at = Utc::now();

        self.users.update(&profile).await?;
        if text_changed {
            self.refresher.request_refresh(id).await;
        }

        tracing::info!(user_id = %id, embedding_stale = text_changed, "profile updated");
        publisher::publish_profile_updated(self.events.as_ref(), id, text_changed).await;
        Ok(with_resolved_photos(self.photos.as_ref(), profile).await)
    }

    pub async fn get_profile(&self, id: UserId) -> AppResult<UserProfile> {
        let profile = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        Ok(with_resolved_photos(self.photos.as_ref(), profile).await)
    }

    /// Delete a user and everything that references them: messages in their
    /// matches, swipes on both sides, matches, their daily picks.
    pub async fn delete_user(&self, id: UserId) -> AppResult<DeletionSummary> {
        if self.users.get(id).await?.is_none() {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }

        let mut messages_deleted = 0;
        for m in self.ledger.all_matches_for_user(id).await? {
            messages_deleted += self.messages.delete_for_match(m.id).await?;
        }
        let counts = self.ledger.delete_user(id).await?;
        let daily_picks_deleted = self.picks.delete(id).await?;
        self.users.delete(id).await?;

        tracing::warn!(
            user_id = %id,
            swipes = counts.swipes,
            matches = counts.matches,
            messages = messages_deleted,
            "user deleted"
        );
        publisher::publish_user_deleted(self.events.as_ref(), id, counts, messages_deleted).await;

        Ok(DeletionSummary {
            swipes_deleted: counts.swipes,
            matches_deleted: counts.matches,
            messages_deleted,
            daily_picks_deleted,
        })
    }
}

impl ProfileService {
    /// Create the demo accounts. A profile whose embedding fails is skipped
    /// and the rest are still created.
    pub async fn seed_demo_profiles(&self) -> AppResult<DemoSeedSummary> {
        let mut summary = DemoSeedSummary::default();
        for input in demo::demo_profiles(Local::now().date_naive()) {
            let name = input.name.clone();
            match self.insert_profile(uuid::Uuid::now_v7(), input, true).await {
                Ok(profile) => summary.created.push(profile.id),
                Err(e) if e.is(ErrorCode::ProviderError) => {
                    tracing::warn!(name = %name, error = %e, "skipping demo profile without embedding");
                    summary.skipped.push(name);
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(created = summary.created.len(), skipped = summary.skipped.len(), "demo profiles seeded");
        Ok(summary)
    }

    /// Cascade-delete every demo account.
    pub async fn clear_demo_profiles(&self) -> AppResult<DemoCleanup> {
        let mut cleanup = DemoCleanup::default();
        for profile in demo::demo_users(self.users.as_ref()).await? {
            self.delete_user(profile.id).await?;
            cleanup.deleted += 1;
        }
        tracing::warn!(deleted = cleanup.deleted, "demo profiles cleared");
        Ok(cleanup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interests_are_trimmed_and_deduplicated() {
        let cleaned = clean_interests(vec![" hiking".into(), "jazz".into(), "hiking".into(), "  ".into()]);
        assert_eq!(cleaned, vec!["hiking".to_string(), "jazz".to_string()]);
    }

    #[test]
    fn underage_birthdate_is_rejected() {
        let dob = Local::now().date_naive() - chrono::Duration::days(365 * 10);
        let err = validated_age(dob).unwrap_err();
        assert!(err.is(ErrorCode::InvalidProfile));
    }
}
