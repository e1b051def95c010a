use super::*;
use crate::config::DeliveryMode;
use crate::storage::MemoryStore;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// tar.zst archive holding `file1.tar.zst` with a short text body
fn tar_zst_fixture() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let content = b"This is a test file.";
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(1_700_000_000);
    builder
        .append_data(&mut header, "file1.tar.zst", &content[..])
        .unwrap();
    zstd::encode_all(builder.into_inner().unwrap().as_slice(), 3).unwrap()
}

async fn origin_serving(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

fn router_with(config: Config, store: Option<MemoryStore>) -> Router {
    let store = store.map(|s| Arc::new(s) as Arc<dyn crate::storage::ObjectStore>);
    let repackager = Arc::new(Repackager::new(&config, store).unwrap());
    create_router(repackager, Arc::new(config))
}

fn inline_router() -> Router {
    router_with(Config::default(), None)
}

async fn post_convert(app: Router, body: &str) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, serde_json::from_slice(&bytes).unwrap())
}

fn assert_fixed_error(body: &Value, code: &str, message: &str) {
    assert_eq!(body["error"]["code"], code, "{body}");
    assert_eq!(body["error"]["message"], message, "{body}");
}

// ---------------------------------------------------------------------------
// System endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_endpoint() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = inline_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();

    let response = inline_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/convert"]["post"].is_object());
}

#[tokio::test]
async fn test_cors_enabled() {
    let mut config = Config::default();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = router_with(config, None);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled_by_default() {
    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = inline_router().oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

// ---------------------------------------------------------------------------
// POST /convert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_convert_inline_returns_base64_zip() {
    let server = origin_serving(
        "/file1.tar.zst",
        ResponseTemplate::new(200).set_body_bytes(tar_zst_fixture()),
    )
    .await;

    let request = format!(r#"{{"url": "{}/file1.tar.zst"}}"#, server.uri());
    let (status, headers, body) = post_convert(inline_router(), &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=\"file1.zip\""
    );
    assert_eq!(body["mode"], "inline");
    assert_eq!(body["file_name"], "file1.zip");
    assert_eq!(body["content_type"], "application/zip");
    assert_eq!(body["is_base64_encoded"], true);
    assert_eq!(body["entries"], 1);

    let zip_bytes = BASE64.decode(body["body"].as_str().unwrap()).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    assert_eq!(zip.len(), 1);
    let mut entry = zip.by_index(0).unwrap();
    assert_eq!(entry.name(), "file1.tar.zst");
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    assert_eq!(content, "This is a test file.");
}

#[tokio::test]
async fn test_convert_presigned_returns_url() {
    let server = origin_serving(
        "/builds/file1.tar.zst",
        ResponseTemplate::new(200).set_body_bytes(tar_zst_fixture()),
    )
    .await;
    let mut config = Config::default();
    config.delivery.mode = DeliveryMode::Presigned;
    config.delivery.presign_expiry = Duration::from_secs(900);
    let store = MemoryStore::new();
    let app = router_with(config, Some(store.clone()));

    let request = format!(r#"{{"url": "{}/builds/file1.tar.zst"}}"#, server.uri());
    let (status, headers, body) = post_convert(app, &request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("content-disposition").is_none());
    assert_eq!(body["mode"], "presigned");
    assert_eq!(body["file_name"], "file1.zip");
    assert_eq!(body["expires_in_secs"], 900);
    assert_eq!(body["entries"], 1);

    let key = body["key"].as_str().unwrap();
    assert!(key.starts_with("file1-") && key.ends_with(".zip"), "{key}");
    assert_eq!(body["url"], format!("memory://{}?expires=900", key));
    assert!(store.get(key).is_some());
}

#[tokio::test]
async fn test_convert_rejects_malformed_json() {
    let (status, _, body) = post_convert(inline_router(), "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_fixed_error(&body, "invalid_request", "Invalid request payload");
}

#[tokio::test]
async fn test_convert_rejects_missing_url() {
    let (status, _, body) = post_convert(inline_router(), r#"{"href": "x"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_fixed_error(&body, "invalid_request", "Invalid request payload");
}

#[tokio::test]
async fn test_convert_rejects_blank_url() {
    let (status, _, body) = post_convert(inline_router(), r#"{"url": "   "}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_fixed_error(&body, "invalid_request", "Invalid request payload");
}

#[tokio::test]
async fn test_convert_rejects_non_http_url() {
    let (status, _, body) =
        post_convert(inline_router(), r#"{"url": "ftp://example.com/a.tar.zst"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_fixed_error(&body, "invalid_url", "Invalid request payload");
}

#[tokio::test]
async fn test_convert_origin_404_is_download_failure() {
    let server = origin_serving("/missing.tar.zst", ResponseTemplate::new(404)).await;

    let request = format!(r#"{{"url": "{}/missing.tar.zst"}}"#, server.uri());
    let (status, _, body) = post_convert(inline_router(), &request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_fixed_error(&body, "download_failed", "Failed to download file");
}

#[tokio::test]
async fn test_convert_corrupt_archive_is_repackage_failure() {
    let mut truncated = tar_zst_fixture();
    truncated.truncate(truncated.len() / 2);
    let server = origin_serving(
        "/broken.tar.zst",
        ResponseTemplate::new(200).set_body_bytes(truncated),
    )
    .await;

    let request = format!(r#"{{"url": "{}/broken.tar.zst"}}"#, server.uri());
    let (status, _, body) = post_convert(inline_router(), &request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_fixed_error(&body, "repackage_failed", "Failed to repackage file");
}

#[tokio::test]
async fn test_convert_upload_failure_is_publish_failure() {
    let server = origin_serving(
        "/file1.tar.zst",
        ResponseTemplate::new(200).set_body_bytes(tar_zst_fixture()),
    )
    .await;
    let mut config = Config::default();
    config.delivery.mode = DeliveryMode::Presigned;
    let app = router_with(config, Some(MemoryStore::failing()));

    let request = format!(r#"{{"url": "{}/file1.tar.zst"}}"#, server.uri());
    let (status, _, body) = post_convert(app, &request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_fixed_error(&body, "publish_failed", "Failed to publish file");
}

// ---------------------------------------------------------------------------
// Server lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_api_server_stops_on_shutdown_signal() {
    let mut config = Config::default();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);
    let repackager = Arc::new(Repackager::new(&config, None).unwrap());

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(repackager, config, async move {
        rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
