//! Helpers for inspecting conversion results

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::io::{Cursor, Read};
use tower::ServiceExt;

/// Every entry of a ZIP archive as `(name, content)`, in archive order
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).expect("zip entry");
            let mut content = Vec::new();
            file.read_to_end(&mut content).expect("read zip entry");
            (file.name().to_string(), content)
        })
        .collect()
}

/// Decode the ZIP carried by an inline conversion response
pub fn inline_zip(body: &Value) -> Vec<u8> {
    assert_eq!(body["mode"], "inline", "{body}");
    assert_eq!(body["is_base64_encoded"], true, "{body}");
    BASE64
        .decode(body["body"].as_str().expect("body is a string"))
        .expect("valid base64")
}

/// POST `{"url": url}` to `/convert` and return status and JSON body
pub async fn convert(app: Router, url: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "url": url }).to_string()))
        .expect("request");

    let response = app.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}
