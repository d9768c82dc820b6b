//! In-process fakes for the provider and event boundaries, plus a profile
//! builder. Used by the unit tests and by the scenarios under `tests/`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult};

use crate::config::MatchingSettings;
use crate::events::publisher::EventSink;
use crate::models::{AgeRange, Gender, UserId, UserProfile, EMBEDDING_DIM, MAX_AGE, MIN_AGE};
use crate::providers::{ChatProvider, CompletionOptions, EmbeddingProvider, EmbeddingRefresher, PhotoResolver};
use crate::store::memory::{MemoryDailyPickStore, MemoryLedgerStore, MemoryMessageStore, MemoryUserStore};
use crate::{Dependencies, Engine};

pub const DEFAULT_CHAT_REPLY: &str = "You both light up talking about the same things.";

/// A complete profile accepting ages 18..=99 with no location limit.
/// The embedding is the fake embedding of an empty text.
pub fn profile(gender: Gender, age: u32, looking_for: &[Gender]) -> UserProfile {
    let now = Utc::now();
    let today = now.date_naive();
    let date_of_birth = today.with_year(today.year() - age as i32);
    UserProfile {
        id: Uuid::new_v4(),
        name: format!("{gender} {age}"),
        date_of_birth,
        age,
        gender,
        bio: String::new(),
        looking_for: looking_for.to_vec(),
        age_range: AgeRange { min: MIN_AGE, max: MAX_AGE },
        interests: Vec::new(),
        photos: Vec::new(),
        location: None,
        max_distance: None,
        is_demo: false,
        embedding: Some(embed_text("")),
        created_at: now,
        updated_at: now,
    }
}

/// Bag-of-words embedding: each lowercase word lands in a bucket picked by
/// its hash, and the result is unit length. Texts sharing words are near.
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let digest = Sha256::digest(word.to_lowercase().as_bytes());
        let bucket = u16::from_be_bytes([digest[0], digest[1]]) as usize % EMBEDDING_DIM;
        v[bucket] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v[0] = 1.0;
    } else {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[derive(Clone, Default)]
pub struct FakeEmbedder {
    failing: Arc<AtomicBool>,
    texts: Arc<Mutex<Vec<String>>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let embedder = Self::default();
        embedder.set_failing(true);
        embedder
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Texts embedded so far.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::provider("embedding provider unavailable"));
        }
        Ok(embed_text(text))
    }
}

/// Chat provider answering from a queue. An empty queue yields
/// [`DEFAULT_CHAT_REPLY`].
#[derive(Clone, Default)]
pub struct ScriptedChat {
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<(String, CompletionOptions)>>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<(String, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> AppResult<String> {
        self.calls.lock().unwrap().push((prompt.to_string(), options));
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AppError::provider(message)),
            None => Ok(DEFAULT_CHAT_REPLY.to_string()),
        }
    }
}

/// Resolves every handle to a fixed CDN prefix.
pub struct PassthroughPhotos;

#[async_trait]
impl PhotoResolver for PassthroughPhotos {
    async fn resolve(&self, photo_ref: &str) -> AppResult<String> {
        Ok(format!("https://cdn.test/{photo_ref}"))
    }
}

#[derive(Clone, Default)]
pub struct RecordingRefresher {
    requests: Arc<Mutex<Vec<UserId>>>,
}

impl RecordingRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<UserId> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingRefresher for RecordingRefresher {
    async fn request_refresh(&self, user_id: UserId) {
        self.requests.lock().unwrap().push(user_id);
    }
}

type PublishedEvent = (&'static str, Option<Uuid>, serde_json::Value);

#[derive(Clone, Default)]
pub struct RecordingEvents {
    published: Arc<Mutex<Vec<PublishedEvent>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published.lock().unwrap().clone()
    }

    pub fn routing_keys(&self) -> Vec<&'static str> {
        self.published.lock().unwrap().iter().map(|(k, _, _)| *k).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEvents {
    async fn publish(&self, routing_key: &'static str, user_id: Option<Uuid>, data: serde_json::Value) {
        self.published.lock().unwrap().push((routing_key, user_id, data));
    }
}

/// An [`Engine`] over the in-memory stores and the fakes above, with
/// handles kept for assertions.
pub struct Harness {
    pub engine: Engine,
    pub users: Arc<MemoryUserStore>,
    pub ledger: Arc<MemoryLedgerStore>,
    pub messages: Arc<MemoryMessageStore>,
    pub picks: Arc<MemoryDailyPickStore>,
    pub embedder: FakeEmbedder,
    pub chat: ScriptedChat,
    pub refresher: RecordingRefresher,
    pub events: RecordingEvents,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(MatchingSettings::default(), ScriptedChat::new())
    }

    pub fn with_chat(chat: ScriptedChat) -> Self {
        Self::build(MatchingSettings::default(), chat)
    }

    pub fn with_settings(settings: MatchingSettings) -> Self {
        Self::build(settings, ScriptedChat::new())
    }

    fn build(settings: MatchingSettings, chat: ScriptedChat) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let ledger = Arc::new(MemoryLedgerStore::new());
        let messages = Arc::new(MemoryMessageStore::new());
        let picks = Arc::new(MemoryDailyPickStore::new());
        let embedder = FakeEmbedder::new();
        let refresher = RecordingRefresher::new();
        let events = RecordingEvents::new();

        let engine = Engine::new(Dependencies {
            users: users.clone(),
            index: users.clone(),
            ledger: ledger.clone(),
            messages: messages.clone(),
            picks: picks.clone(),
            embedder: Arc::new(embedder.clone()),
            chat: Arc::new(chat.clone()),
            photos: Arc::new(PassthroughPhotos),
            refresher: Arc::new(refresher.clone()),
            events: Arc::new(events.clone()),
            settings,
        });

        Self {
            engine,
            users,
            ledger,
            messages,
            picks,
            embedder,
            chat,
            refresher,
            events,
        }
    }

    /// Store `profile` directly, bypassing validation.
    pub async fn add(&self, profile: UserProfile) -> UserProfile {
        use crate::store::UserStore;
        self.users
            .insert(&profile)
            .await
            .expect("in-memory insert cannot fail");
        profile
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
