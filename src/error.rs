//! Error types for repackage
//!
//! This module provides the error taxonomy for the whole pipeline:
//! - Stage-specific error types (fetch, transcode, publish)
//! - HTTP status code mapping for API integration
//! - Fixed, non-leaking error responses with machine-readable codes
//! - Context information (entry name, URL, object key)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for repackage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for repackage
///
/// Every failure aborts the conversion it belongs to. Nothing in the pipeline retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "delivery.presign_expiry")
        key: Option<String>,
    },

    /// Fetching the source archive failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Converting the archive failed
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Publishing the converted archive failed
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// The request payload could not be understood
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The whole fetch, transcode and publish sequence exceeded its time budget
    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Name of the pipeline stage that produced this error, for logging
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Fetch(_) => "fetch",
            Error::Transcode(_) => "transcode",
            Error::Publish(_) => "publish",
            Error::InvalidRequest(_) => "request",
            Error::Config { .. } => "config",
            Error::Timeout(_) => "timeout",
            Error::Io(_) | Error::ApiServerError(_) | Error::Other(_) => "internal",
        }
    }
}

/// Errors raised while obtaining the source stream
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The URL uses a scheme other than http or https
    #[error("unsupported URL scheme '{scheme}' in '{url}'")]
    UnsupportedScheme {
        /// The offending URL
        url: String,
        /// The scheme that was found
        scheme: String,
    },

    /// The request could not be sent or the connection failed
    #[error("request to '{url}' failed: {reason}")]
    Request {
        /// The requested URL
        url: String,
        /// The underlying transport failure
        reason: String,
    },

    /// The origin answered with a non-success status
    #[error("HTTP {status} fetching '{url}'")]
    Status {
        /// The requested URL
        url: String,
        /// HTTP status code returned by the origin
        status: u16,
    },
}

/// Errors raised by the tar.zst to ZIP transcoder
///
/// Per-entry variants carry the name of the entry being processed when the failure happened.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The input is not a valid zstd stream
    #[error("malformed zstd stream: {reason}")]
    Decompression {
        /// Decoder message
        reason: String,
    },

    /// The decompressed bytes are not a valid tar archive
    #[error("malformed tar archive{}: {reason}", entry_suffix(.entry))]
    ArchiveFormat {
        /// Entry being read when parsing failed, if any
        entry: Option<String>,
        /// Parser message
        reason: String,
    },

    /// The input ended before the archive did
    #[error("truncated input{}: {reason}", entry_suffix(.entry))]
    TruncatedInput {
        /// Entry being read when the stream ended, if any
        entry: Option<String>,
        /// What was missing
        reason: String,
    },

    /// The ZIP output could not be written or sealed
    #[error("failed to write ZIP output{}: {reason}", entry_suffix(.entry))]
    OutputWrite {
        /// Entry being written, `None` when sealing the archive
        entry: Option<String>,
        /// Writer message
        reason: String,
    },
}

fn entry_suffix(entry: &Option<String>) -> String {
    match entry {
        Some(name) => format!(" at entry '{}'", name),
        None => String::new(),
    }
}

/// Errors raised by the object storage collaborator
#[derive(Debug, Error)]
pub enum PublishError {
    /// Presigned delivery was requested but no object store is configured
    #[error("no object store configured")]
    NotConfigured,

    /// Uploading the object failed
    #[error("failed to upload object '{key}': {reason}")]
    Upload {
        /// Object key
        key: String,
        /// Store message
        reason: String,
    },

    /// Minting the presigned URL failed
    #[error("failed to presign object '{key}': {reason}")]
    Presign {
        /// Object key
        key: String,
        /// Store message
        reason: String,
    },
}

/// API error response format
///
/// Returned by API endpoints when an error occurs. The message is fixed per error
/// category and never includes internal detail; the detail goes to the logs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "repackage_failed",
///     "message": "Failed to repackage file"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "download_failed")
    pub code: String,

    /// Human-readable, fixed error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    /// Create an "invalid request" error
    pub fn invalid_request() -> Self {
        Self::new("invalid_request", "Invalid request payload")
    }

    /// Create an "internal server error"
    pub fn internal() -> Self {
        Self::new("internal_error", "Internal server error")
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// Only two categories exist: client input (400) and server side (500).
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;

    /// Get the fixed message shown to API callers
    fn public_message(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - the caller sent something unusable
            Error::InvalidRequest(_) => 400,
            Error::Fetch(FetchError::InvalidUrl { .. }) => 400,
            Error::Fetch(FetchError::UnsupportedScheme { .. }) => 400,

            // 500 Internal Server Error - everything else
            Error::Fetch(_) => 500,
            Error::Transcode(_) => 500,
            Error::Publish(_) => 500,
            Error::Timeout(_) => 500,
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::Fetch(FetchError::InvalidUrl { .. }) => "invalid_url",
            Error::Fetch(FetchError::UnsupportedScheme { .. }) => "invalid_url",
            Error::Fetch(_) => "download_failed",
            Error::Transcode(_) => "repackage_failed",
            Error::Publish(_) => "publish_failed",
            Error::Timeout(_) => "timeout",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "internal_error",
            Error::ApiServerError(_) => "internal_error",
            Error::Other(_) => "internal_error",
        }
    }

    fn public_message(&self) -> &str {
        match self {
            Error::InvalidRequest(_) => "Invalid request payload",
            Error::Fetch(FetchError::InvalidUrl { .. }) => "Invalid request payload",
            Error::Fetch(FetchError::UnsupportedScheme { .. }) => "Invalid request payload",
            Error::Fetch(_) => "Failed to download file",
            Error::Transcode(_) => "Failed to repackage file",
            Error::Publish(_) => "Failed to publish file",
            Error::Timeout(_) => "Request timed out",
            _ => "Internal server error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::new(error.error_code(), error.public_message())
    }
}
