//! API integration tests
//!
//! Tests for the HTTP API endpoints using axum's test utilities.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use media_library::core::coordinator::ScanCoordinator;
use media_library::core::store::MediaRecordStore;
use media_library::models::config::{
    load_settings, AppSettings, ConfigStore, SettingsStore, LIBRARY_CONFIG_FILE,
};
use media_library::models::media::{MediaRecord, MovieRecord};
use media_library::server::{create_router, AppContext};
use media_library::services::metadata::MetadataClient;
use media_library::services::notifier::NotificationSink;
use media_library::{Error, Result};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Metadata client that never finds anything.
struct NoMetadata;

#[async_trait]
impl MetadataClient for NoMetadata {
    async fn fetch_metadata(&self, title: &str, _cancel: &CancellationToken) -> Result<MovieRecord> {
        Err(Error::MovieNotFound(title.to_string()))
    }

    async fn download_asset(&self, url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>> {
        Err(Error::DownloadFailed {
            url: url.to_string(),
            attempts: 1,
            reason: "offline".to_string(),
        })
    }
}

/// Create a test context backed by a temporary config directory
fn create_test_context(dir: &TempDir) -> AppContext {
    let config = ConfigStore::open(dir.path().join(LIBRARY_CONFIG_FILE)).unwrap();
    let coordinator = ScanCoordinator::new(
        Arc::new(MediaRecordStore::new()),
        Arc::new(NotificationSink::new()),
        Arc::new(NoMetadata),
        Arc::new(config),
    );
    let settings = SettingsStore::new(dir.path(), AppSettings::default());
    AppContext::new(Arc::new(coordinator), Arc::new(settings))
}

/// Helper to get response body as JSON
async fn body_to_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_get_default_config() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .oneshot(
            Request::get("/api/medialibrary/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["libraryPaths"], serde_json::json!([]));
    assert_eq!(json["autoScan"], false);
    assert_eq!(json["scanIntervalMinutes"], 60);
    assert_eq!(json["enableNotifications"], true);
}

#[tokio::test]
async fn test_update_config_persists() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let app = create_router(ctx.clone());

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/medialibrary/config",
            serde_json::json!({
                "libraryPaths": ["/movies"],
                "autoScan": true,
                "scanIntervalMinutes": 30,
                "enableNotifications": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.config.get().scan_interval_minutes, 30);

    let saved = fs::read_to_string(dir.path().join(LIBRARY_CONFIG_FILE)).unwrap();
    assert!(saved.contains("\"scanIntervalMinutes\": 30"));
}

#[tokio::test]
async fn test_update_config_rejects_zero_interval() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let app = create_router(ctx.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/medialibrary/config",
            serde_json::json!({ "scanIntervalMinutes": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("scanIntervalMinutes"));
    assert_eq!(ctx.config.get().scan_interval_minutes, 60);
}

#[tokio::test]
async fn test_files_empty() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .oneshot(
            Request::get("/api/medialibrary/files")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_scan_status_and_cancel() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/medialibrary/scan/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["isScanning"], false);

    let response = app
        .oneshot(
            Request::post("/api/medialibrary/scan/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["message"], "No scan in progress");
}

#[tokio::test]
async fn test_start_scan_is_accepted() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .oneshot(
            Request::post("/api/medialibrary/scan")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], true);
}

#[tokio::test]
async fn test_process_file_validation() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/medialibrary/files/process",
            serde_json::json!({ "filePath": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/medialibrary/files/process",
            serde_json::json!({ "filePath": "/no/such/file.mkv" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("/no/such/file.mkv"));
}

#[tokio::test]
async fn test_process_file_accepted() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let video = dir.path().join("Heat.1995.mkv");
    fs::write(&video, "fake").unwrap();
    let app = create_router(ctx.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/medialibrary/files/process",
            serde_json::json!({ "filePath": video.to_string_lossy() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_image_only_serves_known_artwork() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);

    let video = dir.path().join("Heat.1995.mkv");
    let poster = dir.path().join("Heat.1995-poster.jpg");
    fs::write(&poster, b"jpeg").unwrap();
    let mut record = MediaRecord::new(&video, 4);
    record.poster_path = Some(poster.clone());
    ctx.store.upsert(record);

    let app = create_router(ctx);

    let uri = format!(
        "/api/medialibrary/image?path={}",
        urlencoding::encode(&poster.to_string_lossy())
    );
    let response = app
        .clone()
        .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg");

    let config = dir.path().join(LIBRARY_CONFIG_FILE);
    let uri = format!(
        "/api/medialibrary/image?path={}",
        urlencoding::encode(&config.to_string_lossy())
    );
    let response = app
        .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_initialize_counts_files() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let library = dir.path().join("movies");
    fs::create_dir_all(&library).unwrap();
    fs::write(library.join("Heat.1995.mkv"), "fake").unwrap();
    fs::write(library.join("Alien.1979.avi"), "fake").unwrap();

    let mut config = ctx.config.get();
    config.library_paths = vec![library];
    ctx.config.update(config).unwrap();

    let app = create_router(ctx);
    let response = app
        .oneshot(
            Request::post("/api/medialibrary/initialize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn test_tmdb_settings_default_has_no_key() {
    let dir = TempDir::new().unwrap();
    let app = create_router(create_test_context(&dir));

    let response = app
        .oneshot(Request::get("/api/settings/tmdb").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hasApiKey"], false);
    assert!(json["apiKey"].is_null());
    assert_eq!(json["apiBaseUrl"], "https://api.themoviedb.org/3");
}

#[tokio::test]
async fn test_save_tmdb_settings_persists_and_masks() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let app = create_router(ctx.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/settings/tmdb",
            serde_json::json!({ "apiKey": "0123456789abcdef", "language": "en-US" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(ctx.settings.tmdb().api_key.as_deref(), Some("0123456789abcdef"));
    let saved = load_settings(dir.path()).unwrap();
    assert_eq!(saved.tmdb.api_key.as_deref(), Some("0123456789abcdef"));
    assert_eq!(saved.tmdb.language, "en-US");

    let response = app
        .clone()
        .oneshot(Request::get("/api/settings/tmdb").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hasApiKey"], true);
    assert_eq!(json["apiKey"], "****cdef");

    // Saving the masked key back keeps the stored one
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/settings/tmdb",
            serde_json::json!({ "apiKey": "****cdef", "language": "de-DE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tmdb = ctx.settings.tmdb();
    assert_eq!(tmdb.api_key.as_deref(), Some("0123456789abcdef"));
    assert_eq!(tmdb.language, "de-DE");
}

#[tokio::test]
async fn test_save_tmdb_settings_requires_key() {
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let app = create_router(ctx.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/settings/tmdb",
            serde_json::json!({ "apiKey": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("API key"));
    assert!(ctx.settings.tmdb().api_key.is_none());
}

#[tokio::test]
async fn test_tmdb_connection_test_reports_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authentication"))
        .and(query_param("api_key", "good-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/authentication"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let app = create_router(ctx.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/settings/tmdb/test",
            serde_json::json!({ "apiKey": "good-key", "apiBaseUrl": server.uri() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], true);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/settings/tmdb/test",
            serde_json::json!({ "apiKey": "bad-key", "apiBaseUrl": server.uri() }),
        ))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], false);

    let response = app
        .oneshot(json_request("POST", "/api/settings/tmdb/test", serde_json::json!({})))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("API key"));

    // Testing never saves
    assert!(ctx.settings.tmdb().api_key.is_none());
    assert!(!dir.path().join("settings.toml").exists());
}
