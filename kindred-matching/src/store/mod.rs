//! Persistence boundary of the matching core.
//!
//! Services hold these as `Arc<dyn …>` so the same code runs against
//! Postgres/Redis in production and the in-memory stores in tests.

pub mod memory;
pub mod postgres;
pub mod redis;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};

use kindred_shared::errors::AppResult;

use crate::models::{
    DailyPickSet, Match, MatchId, Message, Swipe, SwipeAction, SwipeOutcome, UserId, UserProfile,
};

/// Lazy sequence of every stored profile.
pub type ProfileStream = futures_lite::stream::Boxed<AppResult<UserProfile>>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: UserId) -> AppResult<Option<UserProfile>>;
    async fn insert(&self, profile: &UserProfile) -> AppResult<()>;
    async fn update(&self, profile: &UserProfile) -> AppResult<()>;
    async fn delete(&self, id: UserId) -> AppResult<bool>;
    async fn update_embedding(&self, id: UserId, embedding: Vec<f32>) -> AppResult<()>;

    /// Stream the whole population without loading it at once. Memory use
    /// must not grow with the number of stored users.
    fn stream_all(&self) -> ProfileStream;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub user_id: UserId,
    /// Cosine similarity, higher is nearer.
    pub score: f64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` users nearest to `vector`, nearest first.
    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> AppResult<Vec<Neighbor>>;
}

/// Result of the atomic swipe-and-detect unit.
#[derive(Debug, Clone, PartialEq)]
pub enum SwipeWrite {
    Recorded {
        outcome: SwipeOutcome,
        /// True only when this write inserted the match row. A pair that
        /// re-likes after a swipe reset keeps its old match and reports false.
        match_created: bool,
    },
    /// The ordered pair was already decided; nothing was written.
    Duplicate(Swipe),
}

impl SwipeWrite {
    pub fn no_match() -> Self {
        Self::Recorded {
            outcome: SwipeOutcome::no_match(),
            match_created: false,
        }
    }

    pub fn matched(match_id: MatchId, match_created: bool) -> Self {
        Self::Recorded {
            outcome: SwipeOutcome::matched(match_id),
            match_created,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSide {
    /// Matches where the user is `user1_id`.
    First,
    /// Matches where the user is `user2_id`.
    Second,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeCounts {
    pub swipes: u64,
    pub matches: u64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert the swipe and, for a like, look up the reciprocal like and
    /// create the match. The whole unit is serialized per unordered pair.
    async fn record_swipe(
        &self,
        swiper: UserId,
        swiped: UserId,
        action: SwipeAction,
    ) -> AppResult<SwipeWrite>;

    async fn get_swipe(&self, swiper: UserId, swiped: UserId) -> AppResult<Option<Swipe>>;
    async fn swiped_ids(&self, swiper: UserId) -> AppResult<HashSet<UserId>>;

    /// Likes targeting `user` from people `user` has not swiped on yet.
    async fn likes_received(&self, user: UserId) -> AppResult<Vec<Swipe>>;

    async fn matches_as(&self, user: UserId, side: MatchSide) -> AppResult<Vec<Match>>;
    async fn find_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>>;
    async fn get_match(&self, id: MatchId) -> AppResult<Option<Match>>;
    async fn set_match_explanation(&self, id: MatchId, text: &str) -> AppResult<bool>;

    /// Remove every swipe and match where `user` is either party.
    async fn delete_user(&self, user: UserId) -> AppResult<CascadeCounts>;
    async fn delete_all_swipes(&self) -> AppResult<u64>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, match_id: MatchId, sender: UserId, content: &str) -> AppResult<Message>;
    /// Oldest first.
    async fn list(&self, match_id: MatchId) -> AppResult<Vec<Message>>;
    async fn last(&self, match_id: MatchId) -> AppResult<Option<Message>>;
    /// Flip unread messages not sent by `reader`. Returns the number flipped.
    async fn mark_read(&self, match_id: MatchId, reader: UserId) -> AppResult<u64>;
    async fn unread_count(&self, match_id: MatchId, reader: UserId) -> AppResult<u64>;
    async fn delete_for_match(&self, match_id: MatchId) -> AppResult<u64>;
}

#[async_trait]
pub trait DailyPickStore: Send + Sync {
    async fn get(&self, user: UserId) -> AppResult<Option<DailyPickSet>>;
    /// Overwrite the user's set. Concurrent writers: last one wins.
    async fn replace(&self, set: &DailyPickSet) -> AppResult<()>;
    async fn delete(&self, user: UserId) -> AppResult<bool>;
    async fn delete_all(&self) -> AppResult<u64>;
}

/// Order-independent key for a user pair.
pub fn ordered_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 64-bit advisory lock key for an unordered pair.
pub fn pair_lock_key(a: UserId, b: UserId) -> i64 {
    let (low, high) = ordered_pair(a, b);
    let mut hasher = Sha256::new();
    hasher.update(low.as_bytes());
    hasher.update(high.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}
