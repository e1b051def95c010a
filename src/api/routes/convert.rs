//! Conversion handler.

use super::{ConvertRequest, ConvertResponse};
use crate::api::AppState;
use crate::error::Error;
use crate::service::ConvertOutcome;
use crate::storage::ZIP_CONTENT_TYPE;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// POST /convert - Convert a remote tar.zst archive to ZIP
#[utoipa::path(
    post,
    path = "/convert",
    tag = "convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Archive converted", body = ConvertResponse),
        (status = 400, description = "Invalid request payload", body = crate::error::ApiError),
        (status = 500, description = "Download, conversion or publishing failed", body = crate::error::ApiError)
    )
)]
pub async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;

    let url = request.url.trim();
    if url.is_empty() {
        return Err(Error::InvalidRequest("url must not be empty".into()));
    }

    let outcome = state.repackager.convert(url).await?;
    let entries = outcome.stats().entries_written;

    let response = match outcome {
        ConvertOutcome::Inline {
            file_name, archive, ..
        } => {
            let disposition = content_disposition(&file_name);
            let body = ConvertResponse::Inline {
                file_name,
                content_type: ZIP_CONTENT_TYPE.to_string(),
                is_base64_encoded: true,
                body: BASE64.encode(&archive),
                entries,
            };
            (
                StatusCode::OK,
                [(header::CONTENT_DISPOSITION, disposition)],
                Json(body),
            )
                .into_response()
        }
        ConvertOutcome::Stored {
            file_name,
            key,
            url,
            expires_in,
            ..
        } => (
            StatusCode::OK,
            Json(ConvertResponse::Presigned {
                file_name,
                key,
                url,
                expires_in_secs: expires_in.as_secs(),
                entries,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// `attachment` disposition for `file_name`, reduced to a header-safe quoted string
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
