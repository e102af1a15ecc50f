//! Route handlers.

use super::{ApiError, AppContext};
use crate::models::config::{MediaLibraryConfig, TmdbSettings};
use crate::models::media::MediaRecord;
use crate::services::notifier::{NotificationEvent, ScanStatus};
use crate::services::tmdb::{redact, TmdbClient};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /config
pub async fn get_config(State(ctx): State<AppContext>) -> Json<MediaLibraryConfig> {
    Json(ctx.config.get())
}

/// PUT|POST /config
pub async fn update_config(
    State(ctx): State<AppContext>,
    Json(config): Json<MediaLibraryConfig>,
) -> Result<Json<Value>, ApiError> {
    ctx.config.update(config)?;
    Ok(Json(json!({ "message": "Configuration saved" })))
}

/// GET /files
pub async fn list_files(State(ctx): State<AppContext>) -> Json<Vec<MediaRecord>> {
    Json(ctx.store.all())
}

/// POST /scan
pub async fn start_scan(State(ctx): State<AppContext>) -> Json<Value> {
    let accepted = ctx.coordinator.spawn_scan();
    let message = if accepted {
        "Scan started"
    } else {
        "Scan already in progress"
    };
    Json(json!({ "message": message, "accepted": accepted }))
}

/// POST /scan/cancel
pub async fn cancel_scan(State(ctx): State<AppContext>) -> Json<Value> {
    let message = if ctx.coordinator.cancel_scan() {
        "Scan cancellation requested"
    } else {
        "No scan in progress"
    };
    Json(json!({ "message": message }))
}

/// GET /scan/status
pub async fn scan_status(State(ctx): State<AppContext>) -> Json<ScanStatus> {
    Json(ScanStatus {
        is_scanning: ctx.coordinator.is_scanning(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFileRequest {
    #[serde(default)]
    pub file_path: String,
}

/// POST /files/process
pub async fn process_file(
    State(ctx): State<AppContext>,
    Json(request): Json<ProcessFileRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.file_path.trim().is_empty() {
        return Err(ApiError::bad_request("filePath is required"));
    }

    let path = PathBuf::from(&request.file_path);
    if !path.is_file() {
        return Err(ApiError::not_found(format!(
            "File not found: {}",
            request.file_path
        )));
    }

    ctx.coordinator.spawn_single_file(path);
    Ok(Json(json!({ "message": "Processing started" })))
}

/// POST /initialize
pub async fn initialize(State(ctx): State<AppContext>) -> Json<Value> {
    let count = ctx.coordinator.initialize().await;
    Json(json!({ "message": "Media library initialized", "count": count }))
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub path: String,
}

/// GET /image?path=
///
/// Only serves files recorded as some record's poster or fanart.
pub async fn get_image(
    State(ctx): State<AppContext>,
    Query(query): Query<ImageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let requested = Path::new(&query.path);
    let known = ctx.store.all().iter().any(|r| {
        r.poster_path.as_deref() == Some(requested) || r.fanart_path.as_deref() == Some(requested)
    });
    if !known {
        return Err(ApiError::not_found(format!("Image not found: {}", query.path)));
    }

    let bytes = tokio::fs::read(requested)
        .await
        .map_err(|_| ApiError::not_found(format!("Image not found: {}", query.path)))?;

    Ok(([(header::CONTENT_TYPE, content_type(requested))], bytes))
}

fn content_type(path: &Path) -> &'static str {
    match crate::utils::fs::get_extension(path).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// GET /events
///
/// Streams every notification as a `{type, data}` JSON payload, starting
/// with the current scan status.
pub async fn events(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.sink.subscribe();
    let current = NotificationEvent::ScanStatus(ScanStatus {
        is_scanning: ctx.coordinator.is_scanning(),
    });

    let stream = tokio_stream::once(current)
        .chain(ReceiverStream::new(rx))
        .map(|event| Ok(Event::default().data(event.to_json())));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// TMDB settings as shown to clients; the key is masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdbSettingsView {
    pub has_api_key: bool,
    pub api_key: Option<String>,
    pub language: String,
    pub api_base_url: String,
    pub image_base_url: String,
}

impl From<TmdbSettings> for TmdbSettingsView {
    fn from(tmdb: TmdbSettings) -> Self {
        Self {
            has_api_key: tmdb.api_key.is_some(),
            api_key: tmdb.api_key.as_deref().map(mask_key),
            language: tmdb.language,
            api_base_url: tmdb.api_base_url,
            image_base_url: tmdb.image_base_url,
        }
    }
}

/// Body of the TMDB save and test requests. Omitted fields keep their
/// current values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TmdbSettingsRequest {
    pub api_key: Option<String>,
    pub language: Option<String>,
    pub api_base_url: Option<String>,
    pub image_base_url: Option<String>,
}

impl TmdbSettingsRequest {
    fn merge_into(self, mut current: TmdbSettings) -> TmdbSettings {
        if let Some(key) = self.api_key {
            // A masked key echoed back by the UI means "unchanged"
            let echoed = current.api_key.as_deref().map(mask_key).as_deref() == Some(key.as_str());
            if !echoed {
                current.api_key = Some(key.trim().to_string());
            }
        }
        if let Some(language) = self.language {
            current.language = language;
        }
        if let Some(url) = self.api_base_url {
            current.api_base_url = url;
        }
        if let Some(url) = self.image_base_url {
            current.image_base_url = url;
        }
        current
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// GET /settings/tmdb
pub async fn get_tmdb_settings(State(ctx): State<AppContext>) -> Json<TmdbSettingsView> {
    Json(ctx.settings.tmdb().into())
}

/// POST /settings/tmdb
pub async fn save_tmdb_settings(
    State(ctx): State<AppContext>,
    Json(request): Json<TmdbSettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    let tmdb = request.merge_into(ctx.settings.tmdb());
    ctx.settings.update_tmdb(tmdb)?;
    Ok(Json(json!({ "message": "TMDB settings saved" })))
}

/// POST /settings/tmdb/test
///
/// Checks the submitted credentials against `/authentication` without
/// saving them.
pub async fn test_tmdb_settings(
    State(ctx): State<AppContext>,
    Json(request): Json<TmdbSettingsRequest>,
) -> Json<Value> {
    let tmdb = request.merge_into(ctx.settings.tmdb());
    let (success, message) = match check_tmdb(&tmdb).await {
        Ok(true) => (true, "TMDB connection succeeded".to_string()),
        Ok(false) => (false, "TMDB rejected the API key".to_string()),
        Err(e) => (false, redact(&e.to_string())),
    };
    tracing::info!(success, "TMDB connection test: {}", message);
    Json(json!({ "success": success, "message": message }))
}

async fn check_tmdb(tmdb: &TmdbSettings) -> crate::Result<bool> {
    tmdb.validate()?;
    TmdbClient::from_settings(tmdb)?.verify_api_key().await
}
