use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use kindred_shared::clients::rabbitmq::RabbitMQClient;
use kindred_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{DailyPickSet, SwipeAction, UserId};
use crate::providers::EmbeddingRefresher;
use crate::store::CascadeCounts;

pub const SOURCE: &str = "kindred-matching";

/// Outbound domain events. Publishing never fails the caller; sinks log
/// and drop on error.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, routing_key: &'static str, user_id: Option<Uuid>, data: serde_json::Value);
}

#[derive(Clone)]
pub struct RabbitEventSink {
    rabbitmq: RabbitMQClient,
}

impl RabbitEventSink {
    pub fn new(rabbitmq: RabbitMQClient) -> Self {
        Self { rabbitmq }
    }
}

#[async_trait]
impl EventSink for RabbitEventSink {
    async fn publish(&self, routing_key: &'static str, user_id: Option<Uuid>, data: serde_json::Value) {
        let mut event = Event::new(SOURCE, routing_key, data);
        if let Some(user_id) = user_id {
            event = event.with_user(user_id);
        }
        if let Err(e) = self.rabbitmq.publish(routing_key, &event).await {
            tracing::error!(routing_key, error = %e, "failed to publish event");
        }
    }
}

async fn emit<T: Serialize>(sink: &dyn EventSink, routing_key: &'static str, user_id: UserId, payload: T) {
    match serde_json::to_value(payload) {
        Ok(data) => sink.publish(routing_key, Some(user_id), data).await,
        Err(e) => tracing::error!(routing_key, error = %e, "failed to encode event payload"),
    }
}

pub async fn publish_swipe_recorded(sink: &dyn EventSink, swiper_id: UserId, swiped_id: UserId, action: SwipeAction) {
    emit(
        sink,
        routing_keys::MATCHING_SWIPE_RECORDED,
        swiper_id,
        payloads::SwipeRecorded {
            swiper_id,
            swiped_id,
            action: action.as_str().to_string(),
        },
    )
    .await;
}

pub async fn publish_match_created(sink: &dyn EventSink, match_id: Uuid, user1_id: UserId, user2_id: UserId) {
    emit(
        sink,
        routing_keys::MATCHING_MATCH_CREATED,
        user1_id,
        payloads::MatchCreated {
            match_id,
            user1_id,
            user2_id,
        },
    )
    .await;
}

pub async fn publish_daily_picks_generated(sink: &dyn EventSink, set: &DailyPickSet) {
    emit(
        sink,
        routing_keys::MATCHING_DAILY_PICKS_GENERATED,
        set.user_id,
        payloads::DailyPicksGenerated {
            user_id: set.user_id,
            pick_count: set.picks.len(),
            expires_at: set.expires_at,
        },
    )
    .await;
}

pub async fn publish_profile_updated(sink: &dyn EventSink, user_id: UserId, embedding_stale: bool) {
    emit(
        sink,
        routing_keys::USER_PROFILE_UPDATED,
        user_id,
        payloads::ProfileUpdated {
            user_id,
            embedding_stale,
        },
    )
    .await;
}

pub async fn publish_user_deleted(sink: &dyn EventSink, user_id: UserId, counts: CascadeCounts, messages_deleted: u64) {
    emit(
        sink,
        routing_keys::USER_DELETED,
        user_id,
        payloads::UserDeleted {
            user_id,
            swipes_deleted: counts.swipes,
            matches_deleted: counts.matches,
            messages_deleted,
        },
    )
    .await;
}

/// Queues embedding regeneration through the event bus; the subscriber
/// does the work outside the request.
pub struct QueuedRefresher<S: EventSink> {
    sink: S,
}

impl<S: EventSink> QueuedRefresher<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S: EventSink> EmbeddingRefresher for QueuedRefresher<S> {
    async fn request_refresh(&self, user_id: UserId) {
        emit(
            &self.sink,
            routing_keys::USER_EMBEDDING_REFRESH_REQUESTED,
            user_id,
            payloads::EmbeddingRefreshRequested { user_id },
        )
        .await;
    }
}
