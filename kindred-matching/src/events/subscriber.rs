use std::sync::Arc;

use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use kindred_shared::clients::rabbitmq::RabbitMQClient;
use kindred_shared::types::event::{payloads, routing_keys, Event};

use crate::matching::retriever::refresh_embedding;
use crate::providers::EmbeddingProvider;
use crate::store::UserStore;

const REFRESH_QUEUE: &str = "kindred-matching.user.embedding.refresh_requested";

/// Regenerate embeddings requested by profile edits. Failures are logged
/// and the delivery is acked anyway; the next edit re-queues the user.
pub async fn listen_embedding_refresh(
    rabbitmq: RabbitMQClient,
    users: Arc<dyn UserStore>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe(REFRESH_QUEUE, &[routing_keys::USER_EMBEDDING_REFRESH_REQUESTED], 4)
        .await?;

    tracing::info!("listening for embedding.refresh_requested events");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
                continue;
            }
        };

        match serde_json::from_slice::<Event<payloads::EmbeddingRefreshRequested>>(&delivery.data) {
            Ok(event) => {
                let user_id = event.data.user_id;
                match refresh_embedding(users.as_ref(), embedder.as_ref(), user_id).await {
                    Ok(()) => tracing::info!(user_id = %user_id, "embedding refreshed"),
                    Err(e) => {
                        tracing::error!(user_id = %user_id, error = %e, "embedding refresh failed")
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to deserialize embedding.refresh_requested event");
            }
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            tracing::warn!(error = %e, "failed to ack delivery");
        }
    }

    Ok(())
}
