use std::sync::Arc;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{UserId, EMBEDDING_DIM};
use crate::providers::EmbeddingProvider;
use crate::store::{Neighbor, UserStore, VectorIndex};

/// Similarity search over profile embeddings.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Nearest `limit` users to `query`, nearest first.
    pub async fn search(&self, query: &[f32], limit: usize) -> AppResult<Vec<Neighbor>> {
        if query.len() != EMBEDDING_DIM {
            return Err(AppError::Validation(format!(
                "query vector has {} dimensions, expected {EMBEDDING_DIM}",
                query.len()
            )));
        }
        self.index
            .nearest_neighbors(query, limit)
            .await
            .map_err(|e| {
                if e.is(ErrorCode::ProviderError) {
                    e
                } else {
                    AppError::provider(format!("vector search failed: {e}"))
                }
            })
    }
}

/// Text fed to the embedding model for a profile.
pub fn build_profile_text<S: AsRef<str>>(bio: &str, interests: &[S]) -> String {
    let interests: Vec<&str> = interests.iter().map(AsRef::as_ref).collect();
    format!("{bio} Interests: {}", interests.join(", "))
}

/// Re-embed a user from their current bio and interests.
pub async fn refresh_embedding(
    users: &dyn UserStore,
    embedder: &dyn EmbeddingProvider,
    user_id: UserId,
) -> AppResult<()> {
    let user = users
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
    let embedding = embedder
        .embed(&build_profile_text(&user.bio, &user.interests))
        .await?;
    if embedding.len() != EMBEDDING_DIM {
        return Err(AppError::provider(format!(
            "embedding has {} dimensions, expected {EMBEDDING_DIM}",
            embedding.len()
        )));
    }
    users.update_embedding(user_id, embedding).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use crate::store::memory::MemoryUserStore;
    use crate::testing::{profile, FakeEmbedder};
    use async_trait::async_trait;

    struct DownIndex;

    #[async_trait]
    impl VectorIndex for DownIndex {
        async fn nearest_neighbors(&self, _: &[f32], _: usize) -> AppResult<Vec<Neighbor>> {
            Err(AppError::internal("connection refused"))
        }
    }

    #[test]
    fn profile_text_joins_interests() {
        assert_eq!(
            build_profile_text("Loves dogs.", &["hiking", "jazz"]),
            "Loves dogs. Interests: hiking, jazz"
        );
    }

    #[tokio::test]
    async fn wrong_dimension_fails_fast() {
        let retriever = Retriever::new(Arc::new(DownIndex));
        let err = retriever.search(&[0.1, 0.2], 5).await.unwrap_err();
        assert!(err.is(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn index_failure_is_a_provider_error() {
        let retriever = Retriever::new(Arc::new(DownIndex));
        let err = retriever.search(&vec![0.0; EMBEDDING_DIM], 5).await.unwrap_err();
        assert!(err.is(ErrorCode::ProviderError));
    }

    #[tokio::test]
    async fn refresh_stores_new_embedding() {
        let users = MemoryUserStore::new();
        let mut p = profile(Gender::Woman, 30, &[Gender::Man]);
        p.embedding = None;
        users.insert(&p).await.unwrap();

        refresh_embedding(&users, &FakeEmbedder::new(), p.id).await.unwrap();
        assert!(users.get(p.id).await.unwrap().unwrap().has_embedding());
    }
}
