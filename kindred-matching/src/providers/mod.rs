//! External collaborators of the matching core: embedding and chat
//! completion providers, photo URL resolution, and the embedding refresh
//! queue.

pub mod openai;
pub mod storage;

use async_trait::async_trait;

use kindred_shared::errors::AppResult;

use crate::models::{UserId, UserProfile};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> AppResult<String>;
}

#[async_trait]
pub trait PhotoResolver: Send + Sync {
    /// Turn a storage handle into a URL a client can load.
    async fn resolve(&self, photo_ref: &str) -> AppResult<String>;
}

/// Fire-and-forget request to regenerate a user's embedding.
#[async_trait]
pub trait EmbeddingRefresher: Send + Sync {
    async fn request_refresh(&self, user_id: UserId);
}

pub fn is_direct_uri(photo_ref: &str) -> bool {
    ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| photo_ref.starts_with(scheme))
}

/// Resolve one photo ref. Direct URIs pass through untouched; a failed
/// lookup falls back to the original ref.
pub async fn resolve_photo(resolver: &dyn PhotoResolver, photo_ref: &str) -> String {
    if is_direct_uri(photo_ref) {
        return photo_ref.to_string();
    }
    match resolver.resolve(photo_ref).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(photo_ref = %photo_ref, error = %e, "photo resolution failed");
            photo_ref.to_string()
        }
    }
}

/// Replace every photo ref on the profile with a display URL.
pub async fn with_resolved_photos(resolver: &dyn PhotoResolver, mut profile: UserProfile) -> UserProfile {
    let mut resolved = Vec::with_capacity(profile.photos.len());
    for photo in &profile.photos {
        resolved.push(resolve_photo(resolver, photo).await);
    }
    profile.photos = resolved;
    profile
}
