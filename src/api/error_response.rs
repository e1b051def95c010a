//! HTTP error response handling for the API
//!
//! Domain errors become a status code plus a fixed JSON body. The full error,
//! including its stage and detail, is logged here and nowhere else.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(stage = self.stage(), error = %self, "request failed");
        } else {
            tracing::warn!(stage = self.stage(), error = %self, "request rejected");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Without a domain error to inspect, assume the server side is at fault
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, PublishError, TranscodeError};

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn invalid_request_is_400_with_fixed_text() {
        let response = Error::InvalidRequest("expected value at line 1".into()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "invalid_request");
        assert_eq!(api_error.error.message, "Invalid request payload");
    }

    #[tokio::test]
    async fn transcode_error_is_500_without_detail() {
        let error = Error::Transcode(TranscodeError::TruncatedInput {
            entry: Some("private/notes.txt".into()),
            reason: "entry declares 10 bytes but the stream ended after 4".into(),
        });
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "repackage_failed");
        assert_eq!(api_error.error.message, "Failed to repackage file");
    }

    #[tokio::test]
    async fn fetch_and_publish_errors_have_their_own_messages() {
        let fetch = Error::Fetch(FetchError::Status {
            url: "http://origin/a.tar.zst".into(),
            status: 404,
        });
        assert_eq!(
            body_of(fetch.into_response()).await.error.message,
            "Failed to download file"
        );

        let publish = Error::Publish(PublishError::Upload {
            key: "a.zip".into(),
            reason: "AccessDenied".into(),
        });
        assert_eq!(
            body_of(publish.into_response()).await.error.message,
            "Failed to publish file"
        );
    }

    #[tokio::test]
    async fn bare_api_error_defaults_to_500() {
        let response = ApiError::internal().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
