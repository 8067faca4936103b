// SPDX-License-Identifier: PMPL-1.0-or-later
//! PITR Archive API
//!
//! HTTP service around the archive engine: lists archive days, reports each
//! day's recovery window, and triggers reconciliation. Also hosts the
//! background shipping and archiving tasks.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use pitr_heal::{
    spawn_notification_worker, ArchiveEngine, DayReport, LogSink, NotificationSink, Notifier,
    PitrError, QueuedNotifier, ReconciliationReport, Severity, WalShipper,
};
use pitr_storage::{ArchiveStore, LocalArchiveStore};
use pitr_wal::{ArchiveDay, DayEntry, PitrMetadata};

pub mod bus;
pub mod config;
pub mod tasks;
pub mod telegram;

pub use config::{ConfigError, ServiceConfig, TelegramConfig};

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PitrError> for ApiError {
    fn from(err: PitrError) -> Self {
        let message = err.to_string();
        match err {
            PitrError::ArchiveDayNotFound(_) | PitrError::BaseBackupMissing(_) => {
                ApiError::NotFound(message)
            }
            PitrError::Wal(_) => ApiError::BadRequest(message),
            PitrError::HealingInProgress(_) => ApiError::Conflict(message),
            PitrError::RemoteStoreUnavailable(_) => ApiError::Unavailable(message),
            _ => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(Envelope::<()>::failure(message))).into_response()
    }
}

/// Response body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: String,
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ArchiveEngine>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(engine: Arc<ArchiveEngine>) -> Self {
        Self {
            engine,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/pitr/days", get(list_days_handler))
        .route("/pitr/days/{date}", get(get_window_handler))
        .route("/pitr/reconcile", post(reconcile_handler))
        .route("/pitr/reconcile/{date}", post(reconcile_day_handler))
        .with_state(state)
}

#[instrument(skip(state))]
async fn health_handler(State(state): State<AppState>) -> Json<Envelope<HealthResponse>> {
    Json(Envelope::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store: state.engine.store().name().to_string(),
    }))
}

/// Ready once the archive store answers a listing.
#[instrument(skip(state))]
async fn ready_handler(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .engine
        .store()
        .list_day_namespaces()
        .await
        .map(|_| StatusCode::OK)
        .map_err(|err| ApiError::Unavailable(err.to_string()))
}

#[instrument(skip(state))]
async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.engine.registry().gather(), &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer))
}

#[instrument(skip(state))]
async fn list_days_handler(State(state): State<AppState>) -> ApiResult<Vec<DayEntry>> {
    Ok(Json(Envelope::success(state.engine.list_days().await)))
}

#[instrument(skip(state))]
async fn get_window_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<PitrMetadata> {
    let metadata = state.engine.get_metadata(&date).await?;
    Ok(Json(Envelope::success(metadata)))
}

#[instrument(skip(state))]
async fn reconcile_handler(State(state): State<AppState>) -> ApiResult<ReconciliationReport> {
    Ok(Json(Envelope::success(
        state.engine.run_startup_reconciliation().await,
    )))
}

#[instrument(skip(state))]
async fn reconcile_day_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<DayReport> {
    let day = ArchiveDay::parse(&date).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(Envelope::success(state.engine.reconcile_day(&day).await)))
}

/// Install the process-wide rustls crypto provider. Safe to call repeatedly.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Errors that stop the service from starting.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] PitrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire the engine, notifications and background tasks, then serve HTTP
/// until the process is stopped.
pub async fn serve(config: ServiceConfig) -> Result<(), ServeError> {
    let (notifier, receiver) = QueuedNotifier::channel(config.notification_queue);
    let sink: Arc<dyn NotificationSink> = match &config.telegram {
        Some(telegram) => Arc::new(telegram::TelegramSink::new(telegram.clone())?),
        None => {
            warn!("Telegram not configured, notifications are logged only");
            Arc::new(LogSink)
        }
    };
    spawn_notification_worker(receiver, sink, config.notification_pacing);
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    let store = Arc::new(LocalArchiveStore::new(&config.archive_root));
    let engine = Arc::new(
        ArchiveEngine::builder(store.clone(), Arc::clone(&notifier))
            .config(config.engine.clone())
            .registry(prometheus::Registry::new())
            .build()?,
    );

    notifier.notify(
        Severity::Info,
        format!(
            "PITR archive service online at {}",
            engine.clock().now().format("%d %b %y %H:%M UTC")
        ),
    );

    tasks::spawn_shipper(
        WalShipper::new(&config.wal_spool, store, Arc::clone(engine.clock())),
        config.ship_interval,
    );
    tasks::spawn_nightly_archive(Arc::clone(&engine));
    if config.startup_reconciliation {
        tasks::spawn_startup_reconciliation(Arc::clone(&engine));
    }

    let app = build_router(AppState::new(engine));
    info!("Starting PITR archive API on {}", config.listen_addr);
    let listener = TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let queued notifications drain briefly.
    tokio::time::sleep(Duration::from_millis(250)).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
