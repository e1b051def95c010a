//! Route handlers for the REST API
//!
//! - [`convert`]: archive conversion
//! - [`system`]: health and OpenAPI

use serde::{Deserialize, Serialize};

mod convert;
mod system;

pub use convert::*;
pub use system::*;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /convert
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConvertRequest {
    /// HTTP(S) URL of a `.tar.zst` archive
    #[schema(example = "https://example.com/releases/file1.tar.zst")]
    pub url: String,
}

/// Response body for a successful POST /convert
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConvertResponse {
    /// The ZIP is embedded in the response, base64-encoded
    Inline {
        /// Delivered file name
        file_name: String,
        /// Always `application/zip`
        content_type: String,
        /// Always true; `body` is base64
        is_base64_encoded: bool,
        /// Base64-encoded ZIP bytes
        body: String,
        /// Number of ZIP entries
        entries: u64,
    },
    /// The ZIP was uploaded; fetch it from `url` before it expires
    Presigned {
        /// Delivered file name
        file_name: String,
        /// Object key in the bucket
        key: String,
        /// Presigned GET URL
        url: String,
        /// Seconds until `url` expires
        expires_in_secs: u64,
        /// Number of ZIP entries
        entries: u64,
    },
}

/// Response body for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version
    pub version: String,
}
