use async_trait::async_trait;

use kindred_shared::clients::minio::MinioClient;
use kindred_shared::errors::{AppError, AppResult};

use super::PhotoResolver;

/// Resolves storage handles to MinIO URLs: presigned GETs, or plain public
/// object URLs when `ttl_secs` is zero.
#[derive(Clone)]
pub struct StoragePhotoResolver {
    minio: MinioClient,
    ttl_secs: u64,
}

impl StoragePhotoResolver {
    pub fn new(minio: MinioClient, ttl_secs: u64) -> Self {
        Self { minio, ttl_secs }
    }
}

#[async_trait]
impl PhotoResolver for StoragePhotoResolver {
    async fn resolve(&self, photo_ref: &str) -> AppResult<String> {
        if self.ttl_secs == 0 {
            return Ok(self.minio.public_url(photo_ref));
        }
        self.minio
            .presigned_url(photo_ref, self.ttl_secs)
            .await
            .map_err(AppError::provider)
    }
}
