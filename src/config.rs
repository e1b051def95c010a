//! Configuration types for repackage

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, net::SocketAddr, time::Duration};

/// Longest presigned URL lifetime S3-compatible stores accept (7 days)
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Source fetching configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Total time allowed for the request, including reading the body (default: 300 seconds)
    ///
    /// Because the transcoder reads the body as it arrives, this also bounds how long
    /// a stalled origin can keep a conversion blocked.
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Time allowed to establish the connection (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent to the origin
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Compression applied to entries of the output ZIP
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCompression {
    /// No compression
    Stored,
    /// DEFLATE (default)
    #[default]
    Deflated,
}

/// Transcoder configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Compression method for output entries
    #[serde(default)]
    pub compression: OutputCompression,

    /// Compression level (0-9 for deflate, None = library default)
    #[serde(default)]
    pub compression_level: Option<i32>,

    /// Carry the tar modification time over to the ZIP entry (default: true)
    ///
    /// When disabled every entry is stamped with the ZIP epoch, 1980-01-01 00:00:00.
    #[serde(default = "default_true")]
    pub preserve_mtime: bool,

    /// Carry Unix permission bits over to the ZIP entry (default: true)
    #[serde(default = "default_true")]
    pub preserve_permissions: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            compression: OutputCompression::default(),
            compression_level: None,
            preserve_mtime: true,
            preserve_permissions: true,
        }
    }
}

/// How a converted archive is handed back to the caller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Return the ZIP bytes base64-encoded in the response (default)
    #[default]
    Inline,
    /// Upload to object storage and return a presigned URL
    Presigned,
}

/// Delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Delivery mode
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Lifetime of presigned URLs (default: 3600 seconds)
    #[serde(default = "default_presign_expiry", with = "duration_serde")]
    pub presign_expiry: Duration,

    /// Prefix prepended to every object key (default: empty)
    #[serde(default)]
    pub key_prefix: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            presign_expiry: default_presign_expiry(),
            key_prefix: String::new(),
        }
    }
}

/// S3-compatible object storage configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL (default: Backblaze B2 us-west-000)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Signing region (default: "us-west-000")
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket receiving converted archives
    pub bucket: String,

    /// Access key ID
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,

    /// Use path-style addressing instead of virtual-hosted buckets (default: true)
    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: false)
    #[serde(default)]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: false,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Request handling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Upper bound on one fetch, transcode and publish sequence (default: 600 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

/// Main configuration for repackage
///
/// Built explicitly by the caller (the server binary builds it from flags and
/// environment variables); the library never reads the process environment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source fetching
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Transcoder behavior
    #[serde(default)]
    pub transcode: TranscodeConfig,

    /// Delivery mode and object key policy
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Object storage, required for presigned delivery
    #[serde(default)]
    pub storage: Option<StorageConfig>,

    /// API server
    #[serde(default)]
    pub api: ApiConfig,

    /// Request handling
    #[serde(default)]
    pub service: ServiceConfig,
}

impl Config {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.delivery.mode == DeliveryMode::Presigned && self.storage.is_none() {
            return Err(Error::Config {
                message: "presigned delivery requires a storage configuration".into(),
                key: Some("storage".into()),
            });
        }

        if self.delivery.presign_expiry.is_zero()
            || self.delivery.presign_expiry > MAX_PRESIGN_EXPIRY
        {
            return Err(Error::Config {
                message: format!(
                    "presign expiry must be between 1 second and {} seconds",
                    MAX_PRESIGN_EXPIRY.as_secs()
                ),
                key: Some("delivery.presign_expiry".into()),
            });
        }

        if let Some(level) = self.transcode.compression_level
            && !(0..=9).contains(&level)
        {
            return Err(Error::Config {
                message: format!("compression level {} is outside 0-9", level),
                key: Some("transcode.compression_level".into()),
            });
        }

        if let Some(storage) = &self.storage
            && storage.bucket.is_empty()
        {
            return Err(Error::Config {
                message: "bucket name must not be empty".into(),
                key: Some("storage.bucket".into()),
            });
        }

        if self.service.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".into(),
                key: Some("service.request_timeout".into()),
            });
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("repackage/{}", env!("CARGO_PKG_VERSION"))
}

fn default_presign_expiry() -> Duration {
    Duration::from_secs(3600)
}

fn default_endpoint() -> String {
    "https://s3.us-west-000.backblazeb2.com".to_string()
}

fn default_region() -> String {
    "us-west-000".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(600)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
