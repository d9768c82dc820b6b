use std::sync::Arc;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{MatchId, UserProfile};
use crate::providers::{ChatProvider, CompletionOptions};
use crate::store::{LedgerStore, UserStore};

pub const PICK_FALLBACK: &str = "You two seem like a great match!";
pub const MATCH_FALLBACK: &str =
    "You two share a spark worth exploring. Say hello and see where the conversation takes you!";

const PICK_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 60,
    temperature: 0.8,
};
const MATCH_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 150,
    temperature: 0.7,
};

fn profile_block(label: &str, p: &UserProfile) -> String {
    format!(
        "{label}:\nName: {}\nBio: {}\nInterests: {}",
        p.name,
        p.bio,
        p.interests.join(", ")
    )
}

fn pick_prompt(viewer: &UserProfile, candidate: &UserProfile) -> String {
    format!(
        "You are a friendly matchmaker for a dating app. Given these two profiles, write ONE short, \
         warm sentence (max 20 words) explaining why they might be compatible. Focus on their shared \
         interests or complementary traits. Be specific and encouraging.\n\n{}\n\n{}\n\nWrite a brief match insight:",
        profile_block("User 1", viewer),
        profile_block("User 2", candidate),
    )
}

fn match_prompt(a: &UserProfile, b: &UserProfile) -> String {
    format!(
        "You are a friendly matchmaker. Given these two dating profiles, explain in 2-3 warm, \
         encouraging sentences why they would be compatible. Be specific about their shared \
         interests.\n\n{}\n\n{}\n\nWrite a brief, personalized match explanation:",
        profile_block("Profile 1", a),
        profile_block("Profile 2", b),
    )
}

/// Best-effort compatibility blurbs. Provider failures never escape the
/// `explain_*` methods; they degrade to fixed fallback text.
#[derive(Clone)]
pub struct Explainer {
    chat: Arc<dyn ChatProvider>,
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn LedgerStore>,
}

impl Explainer {
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        users: Arc<dyn UserStore>,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        Self { chat, users, ledger }
    }

    async fn complete_or(&self, prompt: &str, options: CompletionOptions, kind: &'static str, fallback: &str) -> String {
        match self.chat.complete(prompt, options).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(kind, "explanation provider returned empty text");
                metrics::counter!("explanation_fallbacks_total", "kind" => kind).increment(1);
                fallback.to_string()
            }
            Err(e) => {
                tracing::warn!(kind, error = %e, "explanation generation failed, using fallback");
                metrics::counter!("explanation_fallbacks_total", "kind" => kind).increment(1);
                fallback.to_string()
            }
        }
    }

    /// One-sentence insight for a daily pick.
    pub async fn explain_pick(&self, viewer: &UserProfile, candidate: &UserProfile) -> String {
        self.complete_or(&pick_prompt(viewer, candidate), PICK_OPTIONS, "pick", PICK_FALLBACK)
            .await
    }

    /// Two or three sentences for an established match.
    pub async fn explain_match(&self, a: &UserProfile, b: &UserProfile) -> String {
        self.complete_or(&match_prompt(a, b), MATCH_OPTIONS, "match", MATCH_FALLBACK)
            .await
    }

    /// Explain a stored match and persist the text on it.
    pub async fn generate_match_explanation(&self, match_id: MatchId) -> AppResult<String> {
        let m = self
            .ledger
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

        let (Some(user1), Some(user2)) = (
            self.users.get(m.user1_id).await?,
            self.users.get(m.user2_id).await?,
        ) else {
            return Err(AppError::new(ErrorCode::UserNotFound, "match participant not found"));
        };

        let explanation = self.explain_match(&user1, &user2).await;
        self.ledger.set_match_explanation(match_id, &explanation).await?;
        tracing::debug!(match_id = %match_id, "match explanation stored");
        Ok(explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, SwipeAction};
    use crate::store::memory::{MemoryLedgerStore, MemoryUserStore};
    use crate::testing::{profile, ScriptedChat};

    fn explainer(chat: ScriptedChat) -> (Explainer, Arc<MemoryUserStore>, Arc<MemoryLedgerStore>) {
        let users = Arc::new(MemoryUserStore::new());
        let ledger = Arc::new(MemoryLedgerStore::new());
        (
            Explainer::new(Arc::new(chat), users.clone(), ledger.clone()),
            users,
            ledger,
        )
    }

    #[tokio::test]
    async fn pick_reply_is_trimmed_and_uses_short_options() {
        let chat = ScriptedChat::new().reply("  Both love hiking.  \n");
        let (explainer, _, _) = explainer(chat.clone());
        let a = profile(Gender::Woman, 30, &[Gender::Man]);
        let b = profile(Gender::Man, 31, &[Gender::Woman]);

        assert_eq!(explainer.explain_pick(&a, &b).await, "Both love hiking.");
        let calls = chat.calls();
        assert_eq!(calls[0].1, PICK_OPTIONS);
        assert!(calls[0].0.contains("max 20 words"));
    }

    #[tokio::test]
    async fn pick_falls_back_on_error_or_empty() {
        let chat = ScriptedChat::new().fail("timeout").reply("   ");
        let (explainer, _, _) = explainer(chat);
        let a = profile(Gender::Woman, 30, &[Gender::Man]);
        let b = profile(Gender::Man, 31, &[Gender::Woman]);

        assert_eq!(explainer.explain_pick(&a, &b).await, PICK_FALLBACK);
        assert_eq!(explainer.explain_pick(&a, &b).await, PICK_FALLBACK);
    }

    #[tokio::test]
    async fn match_explanation_is_persisted() {
        let chat = ScriptedChat::new().reply("You both adore jazz. Go see a show.");
        let (explainer, users, ledger) = explainer(chat);
        let a = profile(Gender::Woman, 30, &[Gender::Man]);
        let b = profile(Gender::Man, 31, &[Gender::Woman]);
        users.insert(&a).await.unwrap();
        users.insert(&b).await.unwrap();
        ledger.record_swipe(a.id, b.id, SwipeAction::Like).await.unwrap();
        ledger.record_swipe(b.id, a.id, SwipeAction::Like).await.unwrap();
        let m = ledger.find_match(a.id, b.id).await.unwrap().unwrap();

        let text = explainer.generate_match_explanation(m.id).await.unwrap();
        let stored = ledger.get_match(m.id).await.unwrap().unwrap();
        assert_eq!(stored.ai_explanation.as_deref(), Some(text.as_str()));
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let (explainer, _, _) = explainer(ScriptedChat::new());
        let err = explainer
            .generate_match_explanation(uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::MatchNotFound));
    }
}
