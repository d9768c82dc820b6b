use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `kindred.{domain}.{entity}.{action}`
/// Example: `kindred.matching.match.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // User events
    pub const USER_PROFILE_UPDATED: &str = "kindred.user.profile.updated";
    pub const USER_EMBEDDING_REFRESH_REQUESTED: &str = "kindred.user.embedding.refresh_requested";
    pub const USER_DELETED: &str = "kindred.user.deleted";

    // Matching events
    pub const MATCHING_SWIPE_RECORDED: &str = "kindred.matching.swipe.recorded";
    pub const MATCHING_MATCH_CREATED: &str = "kindred.matching.match.created";
    pub const MATCHING_DAILY_PICKS_GENERATED: &str = "kindred.matching.daily_picks.generated";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileUpdated {
        pub user_id: Uuid,
        pub embedding_stale: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmbeddingRefreshRequested {
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserDeleted {
        pub user_id: Uuid,
        pub swipes_deleted: u64,
        pub matches_deleted: u64,
        pub messages_deleted: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SwipeRecorded {
        pub swiper_id: Uuid,
        pub swiped_id: Uuid,
        pub action: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub match_id: Uuid,
        pub user1_id: Uuid,
        pub user2_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DailyPicksGenerated {
        pub user_id: Uuid,
        pub pick_count: usize,
        pub expires_at: chrono::DateTime<chrono::Utc>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_user_and_payload() {
        let user = Uuid::new_v4();
        let event = Event::new(
            "kindred-matching",
            routing_keys::USER_EMBEDDING_REFRESH_REQUESTED,
            payloads::EmbeddingRefreshRequested { user_id: user },
        )
        .with_user(user);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], routing_keys::USER_EMBEDDING_REFRESH_REQUESTED);
        assert_eq!(json["data"]["user_id"], user.to_string());

        let back: Event<payloads::EmbeddingRefreshRequested> = serde_json::from_value(json).unwrap();
        assert_eq!(back.user_id, Some(user));
    }
}
