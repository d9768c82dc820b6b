//! In-process stores. Used by tests and local runs without infrastructure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_lite::StreamExt;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::{
    ordered_pair, CascadeCounts, DailyPickStore, LedgerStore, MatchSide, MessageStore, Neighbor,
    ProfileStream, SwipeWrite, UserStore, VectorIndex,
};
use crate::models::{
    DailyPickSet, Match, MatchId, Message, Swipe, SwipeAction, UserId, UserProfile,
};

// --- Users + vector index ---

#[derive(Default, Clone)]
pub struct MemoryUserStore {
    users: Arc<RwLock<BTreeMap<UserId, UserProfile>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, profile: &UserProfile) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&profile.id) {
            return Err(AppError::bad_request(format!("user {} already exists", profile.id)));
        }
        users.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update(&self, profile: &UserProfile) -> AppResult<()> {
        let mut users = self.users.write().await;
        let slot = users
            .get_mut(&profile.id)
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        *slot = profile.clone();
        Ok(())
    }

    async fn delete(&self, id: UserId) -> AppResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn update_embedding(&self, id: UserId, embedding: Vec<f32>) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        user.embedding = Some(embedding);
        user.updated_at = Utc::now();
        Ok(())
    }

    fn stream_all(&self) -> ProfileStream {
        let users = self.users.clone();
        // Walk by key range so only one profile is held at a time and the
        // lock is released between items.
        futures_lite::stream::unfold(None::<UserId>, move |cursor| {
            let users = users.clone();
            async move {
                let guard = users.read().await;
                let next = match cursor {
                    None => guard.values().next(),
                    Some(last) => guard
                        .range((Bound::Excluded(last), Bound::Unbounded))
                        .map(|(_, p)| p)
                        .next(),
                }
                .cloned();
                drop(guard);
                next.map(|profile| {
                    let id = profile.id;
                    (Ok(profile), Some(id))
                })
            }
        })
        .boxed()
    }
}

#[async_trait]
impl VectorIndex for MemoryUserStore {
    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        let users = self.users.read().await;
        let mut scored: Vec<Neighbor> = users
            .values()
            .filter_map(|u| {
                let embedding = u.embedding.as_deref()?;
                (embedding.len() == vector.len()).then(|| Neighbor {
                    user_id: u.id,
                    score: cosine_similarity(vector, embedding),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

// --- Swipes + matches ---

#[derive(Default)]
struct LedgerState {
    swipes: HashMap<(UserId, UserId), Swipe>,
    matches: HashMap<MatchId, Match>,
    pairs: HashMap<(UserId, UserId), MatchId>,
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    state: RwLock<LedgerState>,
    pair_locks: Mutex<HashMap<(UserId, UserId), Arc<Mutex<()>>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn pair_lock(&self, a: UserId, b: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.pair_locks.lock().await;
        locks.entry(ordered_pair(a, b)).or_default().clone()
    }

    /// Drop the pair's lock entry once no other swipe holds or awaits it.
    async fn release_pair_lock(&self, a: UserId, b: UserId, lock: Arc<Mutex<()>>) {
        let mut locks = self.pair_locks.lock().await;
        drop(lock);
        let pair = ordered_pair(a, b);
        if locks.get(&pair).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&pair);
        }
    }

    pub async fn pair_lock_count(&self) -> usize {
        self.pair_locks.lock().await.len()
    }

    pub async fn match_count_for_pair(&self, a: UserId, b: UserId) -> usize {
        let state = self.state.read().await;
        state
            .matches
            .values()
            .filter(|m| m.involves(a) && m.involves(b))
            .count()
    }

    async fn write_swipe(&self, swiper: UserId, swiped: UserId, action: SwipeAction) -> SwipeWrite {
        if let Some(existing) = self.state.read().await.swipes.get(&(swiper, swiped)) {
            return SwipeWrite::Duplicate(existing.clone());
        }

        let now = Utc::now();
        let mut state = self.state.write().await;
        state.swipes.insert(
            (swiper, swiped),
            Swipe {
                id: Uuid::now_v7(),
                swiper_id: swiper,
                swiped_id: swiped,
                action,
                created_at: now,
            },
        );

        if action != SwipeAction::Like {
            return SwipeWrite::no_match();
        }

        let reciprocal = state
            .swipes
            .get(&(swiped, swiper))
            .is_some_and(|s| s.action == SwipeAction::Like);
        if !reciprocal {
            return SwipeWrite::no_match();
        }

        let pair = ordered_pair(swiper, swiped);
        if let Some(existing) = state.pairs.get(&pair) {
            return SwipeWrite::matched(*existing, false);
        }

        let m = Match {
            id: Uuid::now_v7(),
            user1_id: swiper,
            user2_id: swiped,
            matched_at: now,
            ai_explanation: None,
        };
        state.pairs.insert(pair, m.id);
        let id = m.id;
        state.matches.insert(id, m);
        SwipeWrite::matched(id, true)
    }

    pub async fn swipe_count(&self) -> usize {
        self.state.read().await.swipes.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn record_swipe(
        &self,
        swiper: UserId,
        swiped: UserId,
        action: SwipeAction,
    ) -> AppResult<SwipeWrite> {
        let lock = self.pair_lock(swiper, swiped).await;
        let written = {
            let _pair_guard = lock.lock().await;
            self.write_swipe(swiper, swiped, action).await
        };
        self.release_pair_lock(swiper, swiped, lock).await;
        Ok(written)
    }

    async fn get_swipe(&self, swiper: UserId, swiped: UserId) -> AppResult<Option<Swipe>> {
        Ok(self.state.read().await.swipes.get(&(swiper, swiped)).cloned())
    }

    async fn swiped_ids(&self, swiper: UserId) -> AppResult<HashSet<UserId>> {
        let state = self.state.read().await;
        Ok(state
            .swipes
            .keys()
            .filter(|(from, _)| *from == swiper)
            .map(|(_, to)| *to)
            .collect())
    }

    async fn likes_received(&self, user: UserId) -> AppResult<Vec<Swipe>> {
        let state = self.state.read().await;
        let mut likes: Vec<Swipe> = state
            .swipes
            .values()
            .filter(|s| s.swiped_id == user && s.action == SwipeAction::Like)
            .filter(|s| !state.swipes.contains_key(&(user, s.swiper_id)))
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    async fn matches_as(&self, user: UserId, side: MatchSide) -> AppResult<Vec<Match>> {
        let state = self.state.read().await;
        Ok(state
            .matches
            .values()
            .filter(|m| match side {
                MatchSide::First => m.user1_id == user,
                MatchSide::Second => m.user2_id == user,
            })
            .cloned()
            .collect())
    }

    async fn find_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>> {
        let state = self.state.read().await;
        Ok(state
            .pairs
            .get(&ordered_pair(a, b))
            .and_then(|id| state.matches.get(id))
            .cloned())
    }

    async fn get_match(&self, id: MatchId) -> AppResult<Option<Match>> {
        Ok(self.state.read().await.matches.get(&id).cloned())
    }

    async fn set_match_explanation(&self, id: MatchId, text: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.matches.get_mut(&id) {
            Some(m) => {
                m.ai_explanation = Some(text.to_string());
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, user: UserId) -> AppResult<CascadeCounts> {
        let mut state = self.state.write().await;
        let before_swipes = state.swipes.len();
        state.swipes.retain(|(from, to), _| *from != user && *to != user);
        let before_matches = state.matches.len();
        state.matches.retain(|_, m| !m.involves(user));
        state.pairs.retain(|(low, high), _| *low != user && *high != user);
        Ok(CascadeCounts {
            swipes: (before_swipes - state.swipes.len()) as u64,
            matches: (before_matches - state.matches.len()) as u64,
        })
    }

    async fn delete_all_swipes(&self) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let removed = state.swipes.len() as u64;
        state.swipes.clear();
        Ok(removed)
    }
}

// --- Messages ---

#[derive(Default)]
pub struct MemoryMessageStore {
    by_match: RwLock<HashMap<MatchId, Vec<Message>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, match_id: MatchId, sender: UserId, content: &str) -> AppResult<Message> {
        let message = Message {
            id: Uuid::now_v7(),
            match_id,
            sender_id: sender,
            content: content.to_string(),
            created_at: Utc::now(),
            read: false,
        };
        self.by_match
            .write()
            .await
            .entry(match_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list(&self, match_id: MatchId) -> AppResult<Vec<Message>> {
        Ok(self
            .by_match
            .read()
            .await
            .get(&match_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn last(&self, match_id: MatchId) -> AppResult<Option<Message>> {
        Ok(self
            .by_match
            .read()
            .await
            .get(&match_id)
            .and_then(|msgs| msgs.last().cloned()))
    }

    async fn mark_read(&self, match_id: MatchId, reader: UserId) -> AppResult<u64> {
        let mut by_match = self.by_match.write().await;
        let mut flipped = 0;
        if let Some(msgs) = by_match.get_mut(&match_id) {
            for m in msgs.iter_mut().filter(|m| m.sender_id != reader && !m.read) {
                m.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn unread_count(&self, match_id: MatchId, reader: UserId) -> AppResult<u64> {
        Ok(self
            .by_match
            .read()
            .await
            .get(&match_id)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| m.sender_id != reader && !m.read)
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn delete_for_match(&self, match_id: MatchId) -> AppResult<u64> {
        Ok(self
            .by_match
            .write()
            .await
            .remove(&match_id)
            .map(|msgs| msgs.len() as u64)
            .unwrap_or(0))
    }
}

// --- Daily picks ---

#[derive(Default)]
pub struct MemoryDailyPickStore {
    sets: RwLock<HashMap<UserId, DailyPickSet>>,
}

impl MemoryDailyPickStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DailyPickStore for MemoryDailyPickStore {
    async fn get(&self, user: UserId) -> AppResult<Option<DailyPickSet>> {
        Ok(self.sets.read().await.get(&user).cloned())
    }

    async fn replace(&self, set: &DailyPickSet) -> AppResult<()> {
        self.sets.write().await.insert(set.user_id, set.clone());
        Ok(())
    }

    async fn delete(&self, user: UserId) -> AppResult<bool> {
        Ok(self.sets.write().await.remove(&user).is_some())
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let mut sets = self.sets.write().await;
        let removed = sets.len() as u64;
        sets.clear();
        Ok(removed)
    }
}
