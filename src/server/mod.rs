//! HTTP API and push channel.
//!
//! A static route table under `/api/medialibrary` plus a Server-Sent Events
//! stream that relays every [`NotificationEvent`](crate::services::notifier::NotificationEvent).
//! TMDB credentials are managed under `/api/settings`.

pub mod routes;

use crate::core::coordinator::ScanCoordinator;
use crate::core::store::MediaRecordStore;
use crate::models::config::{ConfigStore, SettingsStore};
use crate::services::notifier::NotificationSink;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub coordinator: Arc<ScanCoordinator>,
    pub store: Arc<MediaRecordStore>,
    pub sink: Arc<NotificationSink>,
    pub config: Arc<ConfigStore>,
    pub settings: Arc<SettingsStore>,
}

impl AppContext {
    pub fn new(coordinator: Arc<ScanCoordinator>, settings: Arc<SettingsStore>) -> Self {
        Self {
            store: Arc::clone(coordinator.store()),
            sink: Arc::clone(coordinator.sink()),
            config: Arc::clone(coordinator.config()),
            coordinator,
            settings,
        }
    }
}

/// Handler error rendered as `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<crate::Error> for ApiError {
    fn from(e: crate::Error) -> Self {
        let status = match &e {
            crate::Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            crate::Error::PathNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Server error in API handler");
        }
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// Build the application router.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/config",
            get(routes::get_config)
                .put(routes::update_config)
                .post(routes::update_config),
        )
        .route("/files", get(routes::list_files))
        .route("/files/process", post(routes::process_file))
        .route("/scan", post(routes::start_scan))
        .route("/scan/cancel", post(routes::cancel_scan))
        .route("/scan/status", get(routes::scan_status))
        .route("/initialize", post(routes::initialize))
        .route("/image", get(routes::get_image))
        .route("/events", get(routes::events));

    let settings = Router::new()
        .route(
            "/tmdb",
            get(routes::get_tmdb_settings).post(routes::save_tmdb_settings),
        )
        .route("/tmdb/test", post(routes::test_tmdb_settings));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/medialibrary", api)
        .nest("/api/settings", settings)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Serve the API on `addr` until `cancel` fires.
pub async fn serve(ctx: AppContext, addr: SocketAddr, cancel: CancellationToken) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Media library API listening on http://{}", addr);

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("Media library API stopped");
    Ok(())
}
