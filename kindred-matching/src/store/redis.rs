use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use kindred_shared::clients::redis::RedisClient;
use kindred_shared::errors::{AppError, AppResult};

use super::DailyPickStore;
use crate::models::{DailyPickSet, UserId};

const KEY_PREFIX: &str = "matching:daily_picks";
const INDEX_KEY: &str = "matching:daily_picks:owners";

/// How long a set outlives its `expires_at`. Expired sets are regenerated on
/// read but picks served before midnight can still be acted on.
const EXPIRY_GRACE_HOURS: i64 = 24;

/// Daily pick sets cached as JSON, one key per user, evicted a grace period
/// after the set's `expires_at`.
#[derive(Clone)]
pub struct RedisDailyPickStore {
    redis: RedisClient,
}

impl RedisDailyPickStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

fn key(user: UserId) -> String {
    format!("{KEY_PREFIX}:{user}")
}

fn ttl_secs(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let evict_at = expires_at + Duration::hours(EXPIRY_GRACE_HOURS);
    (evict_at - now).num_seconds().max(1) as u64
}

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::internal(format!("redis error: {e}"))
}

#[async_trait]
impl DailyPickStore for RedisDailyPickStore {
    async fn get(&self, user: UserId) -> AppResult<Option<DailyPickSet>> {
        let Some(raw) = self.redis.get(&key(user)).await.map_err(redis_err)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(set) => Ok(Some(set)),
            Err(e) => {
                // Unreadable entries behave like a missing set and get regenerated.
                tracing::warn!(user_id = %user, error = %e, "discarding corrupt daily pick set");
                Ok(None)
            }
        }
    }

    async fn replace(&self, set: &DailyPickSet) -> AppResult<()> {
        let payload = serde_json::to_string(set)
            .map_err(|e| AppError::internal(format!("failed to encode daily picks: {e}")))?;
        let ttl = ttl_secs(set.expires_at, Utc::now());
        self.redis
            .set(&key(set.user_id), &payload, ttl)
            .await
            .map_err(redis_err)?;
        self.redis
            .sadd(INDEX_KEY, &set.user_id.to_string())
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn delete(&self, user: UserId) -> AppResult<bool> {
        let existed = self.redis.del(&key(user)).await.map_err(redis_err)?;
        self.redis
            .srem(INDEX_KEY, &user.to_string())
            .await
            .map_err(redis_err)?;
        Ok(existed)
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let owners = self.redis.smembers(INDEX_KEY).await.map_err(redis_err)?;
        let mut removed = 0;
        for owner in owners {
            if self
                .redis
                .del(&format!("{KEY_PREFIX}:{owner}"))
                .await
                .map_err(redis_err)?
            {
                removed += 1;
            }
        }
        self.redis.del(INDEX_KEY).await.map_err(redis_err)?;
        Ok(removed)
    }
}
