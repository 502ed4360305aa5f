mod config;
mod events;

use anyhow::Context;
use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use serde::Serialize;
use sf_storage::{EventLog, InMemoryStore, RocksDbStore};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::CollectorConfig;

const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

pub(crate) type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) events: Arc<dyn EventLog>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CollectorConfig::from_env()?;

    let events: Arc<dyn EventLog> = match &config.db_path {
        Some(path) => {
            info!("recording events to rocksdb at {}", path.display());
            Arc::new(RocksDbStore::open_default(path)?)
        }
        None => {
            warn!("COLLECTOR_DB_PATH not set, events are kept in memory only");
            Arc::new(InMemoryStore::default())
        }
    };

    let app = router(AppState { events }, &config.allowed_origin)?;

    info!("collector-service listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState, allowed_origin: &str) -> anyhow::Result<Router> {
    let origin: HeaderValue = allowed_origin
        .parse()
        .with_context(|| format!("invalid allowed origin '{allowed_origin}'"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/event", post(events::collect_event))
        .route("/events", get(events::list_events))
        .layer(cors)
        .with_state(state))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("collector-service shutting down");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "collector-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "collector-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn internal_error(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn epoch_ms() -> anyhow::Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64)
}
