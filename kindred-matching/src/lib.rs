//! Kindred matching engine: compatibility filtering, the swipe feed, the
//! swipe ledger with mutual-match detection, semantic daily picks and
//! AI explanations, plus the profile and chat services around them.

pub mod chat;
pub mod config;
pub mod demo;
pub mod events;
pub mod matches;
pub mod matching;
pub mod models;
pub mod profiles;
pub mod providers;
pub mod routes;
pub mod schema;
pub mod store;
pub mod testing;

use std::sync::Arc;

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;

use kindred_shared::clients::db::DbPool;
use kindred_shared::clients::rabbitmq::RabbitMQClient;
use kindred_shared::clients::redis::RedisClient;
use kindred_shared::middleware::JwtSecret;

use chat::ChatService;
use config::MatchingSettings;
use events::publisher::EventSink;
use matches::MatchService;
use matching::daily_picks::DailyPicksService;
use matching::explanation::Explainer;
use matching::feed::FeedSelector;
use matching::ledger::SwipeLedger;
use matching::retriever::Retriever;
use profiles::ProfileService;
use providers::{ChatProvider, EmbeddingProvider, EmbeddingRefresher, PhotoResolver};
use store::{DailyPickStore, LedgerStore, MessageStore, UserStore, VectorIndex};

/// Every boundary the engine talks to.
pub struct Dependencies {
    pub users: Arc<dyn UserStore>,
    pub index: Arc<dyn VectorIndex>,
    pub ledger: Arc<dyn LedgerStore>,
    pub messages: Arc<dyn MessageStore>,
    pub picks: Arc<dyn DailyPickStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatProvider>,
    pub photos: Arc<dyn PhotoResolver>,
    pub refresher: Arc<dyn EmbeddingRefresher>,
    pub events: Arc<dyn EventSink>,
    pub settings: MatchingSettings,
}

/// The wired services. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    pub profiles: ProfileService,
    pub swipes: SwipeLedger,
    pub feed: FeedSelector,
    pub daily_picks: DailyPicksService,
    pub explainer: Explainer,
    pub matches: MatchService,
    pub chat: ChatService,
}

impl Engine {
    pub fn new(deps: Dependencies) -> Self {
        let explainer = Explainer::new(deps.chat, deps.users.clone(), deps.ledger.clone());
        let swipes = SwipeLedger::new(
            deps.ledger.clone(),
            deps.users.clone(),
            deps.events.clone(),
            explainer.clone(),
        );
        let feed = FeedSelector::new(
            deps.users.clone(),
            deps.ledger.clone(),
            deps.photos.clone(),
            deps.settings.feed_batch_size,
        );
        let daily_picks = DailyPicksService::new(
            deps.users.clone(),
            deps.picks.clone(),
            swipes.clone(),
            Retriever::new(deps.index),
            explainer.clone(),
            deps.photos.clone(),
            deps.events.clone(),
            deps.settings,
        );
        let profiles = ProfileService::new(
            deps.users.clone(),
            swipes.clone(),
            deps.messages.clone(),
            deps.picks,
            deps.embedder,
            deps.refresher,
            deps.photos.clone(),
            deps.events,
        );
        let matches = MatchService::new(swipes.clone(), deps.users.clone(), deps.photos.clone());
        let chat = ChatService::new(swipes.clone(), deps.messages, deps.users, deps.photos);

        Self {
            profiles,
            swipes,
            feed,
            daily_picks,
            explainer,
            matches,
            chat,
        }
    }
}

/// Connections probed by the health check.
#[derive(Clone)]
pub struct Infra {
    pub db: DbPool,
    pub redis: RedisClient,
    pub rabbitmq: RabbitMQClient,
}

/// Router state. Every field is a handle, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub jwt: JwtSecret,
    pub infra: Option<Infra>,
    pub metrics: Option<PrometheusHandle>,
}

impl FromRef<AppState> for JwtSecret {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
