use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use kindred_shared::clients::db::checkout;
use kindred_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::{AppState, Infra};

const SERVICE: &str = "kindred-matching";

async fn probe(infra: &Infra) -> Vec<HealthCheck> {
    let pool = infra.db.clone();
    let db = match tokio::task::spawn_blocking(move || checkout(&pool).map(|_| ())).await {
        Ok(result) => result,
        Err(e) => Err(kindred_shared::errors::AppError::internal(e.to_string())),
    };
    let rabbitmq = if infra.rabbitmq.is_connected().await {
        Ok(())
    } else {
        Err("connection closed")
    };
    vec![
        HealthCheck::from_result("postgres", db),
        HealthCheck::from_result("redis", infra.redis.ping().await),
        HealthCheck::from_result("rabbitmq", rabbitmq),
    ]
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut resp = HealthResponse::healthy(SERVICE, env!("CARGO_PKG_VERSION"));
    if let Some(infra) = &state.infra {
        resp = resp.with_checks(probe(infra).await);
    }
    let status = match resp.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(resp))
}

pub async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::from("metrics recorder not installed")),
    }
}
