use std::sync::Arc;

use futures_lite::StreamExt;
use serde::Serialize;

use kindred_shared::errors::AppResult;

use super::compatibility::are_compatible;
use super::distance::distance_between;
use crate::models::{UserId, UserProfile};
use crate::providers::{with_resolved_photos, PhotoResolver};
use crate::store::{LedgerStore, UserStore};

#[derive(Debug, Clone, Serialize)]
pub struct FeedCandidate {
    pub profile: UserProfile,
    /// Miles from the viewer; `None` when either location is unknown.
    pub distance: Option<f64>,
}

/// Bounded nearest-first selection. Holds at most `2 × batch` entries while
/// scanning; ties (including unknown distances) keep insertion order.
#[derive(Debug)]
pub struct NearestK<T> {
    batch: usize,
    entries: Vec<(f64, T)>,
}

impl<T> NearestK<T> {
    pub fn new(batch: usize) -> Self {
        let batch = batch.max(1);
        Self {
            batch,
            entries: Vec::with_capacity(batch * 2),
        }
    }

    pub fn push(&mut self, item: T, distance: Option<f64>) {
        self.entries.push((distance.unwrap_or(f64::INFINITY), item));
        if self.entries.len() >= self.batch * 2 {
            self.trim();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn trim(&mut self) {
        // `sort_by` is stable.
        self.entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.entries.truncate(self.batch);
    }

    /// The closest `batch` items, nearest first.
    pub fn into_sorted(mut self) -> Vec<(T, Option<f64>)> {
        self.trim();
        self.entries
            .into_iter()
            .map(|(d, item)| (item, d.is_finite().then_some(d)))
            .collect()
    }
}

#[derive(Clone)]
pub struct FeedSelector {
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn LedgerStore>,
    photos: Arc<dyn PhotoResolver>,
    batch_size: usize,
}

impl FeedSelector {
    pub fn new(
        users: Arc<dyn UserStore>,
        ledger: Arc<dyn LedgerStore>,
        photos: Arc<dyn PhotoResolver>,
        batch_size: usize,
    ) -> Self {
        Self {
            users,
            ledger,
            photos,
            batch_size,
        }
    }

    /// Closest compatible users the viewer has not swiped on yet. An
    /// unknown viewer gets an empty feed.
    pub async fn feed_for(&self, user_id: UserId) -> AppResult<Vec<FeedCandidate>> {
        let Some(viewer) = self.users.get(user_id).await? else {
            return Ok(Vec::new());
        };
        let swiped = self.ledger.swiped_ids(user_id).await?;

        let mut nearest = NearestK::new(self.batch_size);
        let mut scanned = 0usize;
        let mut population = self.users.stream_all();
        while let Some(candidate) = population.next().await {
            let mut candidate = candidate?;
            scanned += 1;
            if candidate.id == viewer.id || swiped.contains(&candidate.id) {
                continue;
            }
            if !are_compatible(&viewer, &candidate) {
                continue;
            }
            let distance = distance_between(viewer.location.as_ref(), candidate.location.as_ref());
            candidate.embedding = None;
            nearest.push(candidate, distance);
        }

        let mut feed = Vec::with_capacity(self.batch_size);
        for (profile, distance) in nearest.into_sorted() {
            feed.push(FeedCandidate {
                profile: with_resolved_photos(self.photos.as_ref(), profile).await,
                distance,
            });
        }

        tracing::debug!(user_id = %user_id, scanned, returned = feed.len(), "feed selected");
        Ok(feed)
    }
}
