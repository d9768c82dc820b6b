use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kindred_matching::config::AppConfig;
use kindred_matching::events::publisher::{QueuedRefresher, RabbitEventSink};
use kindred_matching::events::subscriber;
use kindred_matching::providers::openai::OpenAiClient;
use kindred_matching::providers::storage::StoragePhotoResolver;
use kindred_matching::store::postgres::{PgLedgerStore, PgMessageStore, PgUserStore};
use kindred_matching::store::redis::RedisDailyPickStore;
use kindred_matching::{routes, AppState, Dependencies, Engine, Infra};
use kindred_shared::clients::db::create_pool;
use kindred_shared::clients::minio::MinioClient;
use kindred_shared::clients::rabbitmq::RabbitMQClient;
use kindred_shared::clients::redis::RedisClient;
use kindred_shared::middleware::{init_metrics, init_tracing, metrics_middleware, JwtSecret};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("kindred-matching");
    let metrics = init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;
    if config.openai_api_key.is_empty() {
        tracing::warn!("openai api key is not set; embeddings and explanations will fail");
    }

    // Infrastructure clients
    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    );
    let openai = Arc::new(OpenAiClient::new(
        &config.openai_api_key,
        &config.openai_base_url,
        &config.embedding_model,
        &config.chat_model,
        Duration::from_secs(config.provider_timeout_secs),
    )?);

    let users = Arc::new(PgUserStore::new(db.clone()));
    let events = RabbitEventSink::new(rabbitmq.clone());
    let engine = Engine::new(Dependencies {
        users: users.clone(),
        index: users.clone(),
        ledger: Arc::new(PgLedgerStore::new(db.clone())),
        messages: Arc::new(PgMessageStore::new(db.clone())),
        picks: Arc::new(RedisDailyPickStore::new(redis.clone())),
        embedder: openai.clone(),
        chat: openai.clone(),
        photos: Arc::new(StoragePhotoResolver::new(minio, config.photo_url_ttl_secs)),
        refresher: Arc::new(QueuedRefresher::new(events.clone())),
        events: Arc::new(events),
        settings: config.matching_settings(),
    });

    // Embedding refresh worker
    let sub_rabbitmq = rabbitmq.clone();
    let sub_users = users.clone();
    tokio::spawn(async move {
        if let Err(e) = subscriber::listen_embedding_refresh(sub_rabbitmq, sub_users, openai).await {
            tracing::error!(error = %e, "embedding refresh subscriber failed");
        }
    });

    let state = AppState {
        engine,
        jwt: JwtSecret::new(&config.jwt_secret),
        infra: Some(Infra { db, redis, rabbitmq }),
        metrics: Some(metrics),
    };

    let app = routes::router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "kindred-matching starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
