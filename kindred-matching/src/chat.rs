use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::matching::ledger::SwipeLedger;
use crate::models::{Match, MatchId, Message, UserId, UserProfile};
use crate::providers::{with_resolved_photos, PhotoResolver};
use crate::store::{MessageStore, UserStore};

pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub match_id: MatchId,
    pub matched_at: DateTime<Utc>,
    pub user: UserProfile,
    pub last_message: Option<Message>,
    pub unread_count: u64,
}

impl Conversation {
    fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.matched_at)
    }
}

/// Messaging between the two participants of a match.
#[derive(Clone)]
pub struct ChatService {
    ledger: SwipeLedger,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserStore>,
    photos: Arc<dyn PhotoResolver>,
}

impl ChatService {
    pub fn new(
        ledger: SwipeLedger,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
        photos: Arc<dyn PhotoResolver>,
    ) -> Self {
        Self {
            ledger,
            messages,
            users,
            photos,
        }
    }

    async fn participant_match(&self, match_id: MatchId, user: UserId) -> AppResult<Match> {
        let m = self
            .ledger
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
        if !m.involves(user) {
            return Err(AppError::new(ErrorCode::NotMatchParticipant, "not a participant of this match"));
        }
        Ok(m)
    }

    pub async fn send_message(&self, match_id: MatchId, sender: UserId, content: &str) -> AppResult<Message> {
        self.participant_match(match_id, sender).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyMessage, "message content is empty"));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::Validation(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let message = self.messages.insert(match_id, sender, content).await?;
        tracing::debug!(%match_id, %sender, message_id = %message.id, "message sent");
        Ok(message)
    }

    /// Oldest first.
    pub async fn list_messages(&self, match_id: MatchId, viewer: UserId) -> AppResult<Vec<Message>> {
        self.participant_match(match_id, viewer).await?;
        self.messages.list(match_id).await
    }

    pub async fn mark_as_read(&self, match_id: MatchId, reader: UserId) -> AppResult<u64> {
        self.participant_match(match_id, reader).await?;
        self.messages.mark_read(match_id, reader).await
    }

    pub async fn unread_count(&self, user: UserId) -> AppResult<u64> {
        let mut total = 0;
        for m in self.ledger.all_matches_for_user(user).await? {
            total += self.messages.unread_count(m.id, user).await?;
        }
        Ok(total)
    }

    /// Most recently active first.
    pub async fn conversations(&self, user: UserId) -> AppResult<Vec<Conversation>> {
        let mut out = Vec::new();
        for m in self.ledger.all_matches_for_user(user).await? {
            let Some(other) = m.other_user(user) else { continue };
            let Some(profile) = self.users.get(other).await? else { continue };
            out.push(Conversation {
                match_id: m.id,
                matched_at: m.matched_at,
                user: with_resolved_photos(self.photos.as_ref(), profile).await,
                last_message: self.messages.last(m.id).await?,
                unread_count: self.messages.unread_count(m.id, user).await?,
            });
        }
        out.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
        Ok(out)
    }
}
