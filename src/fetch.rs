//! Source archive fetching over HTTP
//!
//! The response body is exposed as an [`AsyncRead`] so the transcoder can consume it
//! as it arrives instead of buffering the download.

use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use crate::utils::derive_base_name;
use futures::TryStreamExt;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

/// An opened source archive
pub struct FetchedSource {
    /// Base name derived from the URL, `.tar.zst` stripped
    pub base_name: String,
    /// Body size announced by the origin, if any
    pub content_length: Option<u64>,
    /// Forward-only response body
    pub body: Pin<Box<dyn AsyncRead + Send>>,
}

impl std::fmt::Debug for FetchedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedSource")
            .field("base_name", &self.base_name)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// HTTP client for source archives
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build a fetcher from its configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("fetch".to_string()),
            })?;

        Ok(Self { client })
    }

    /// Open `url` and return its body as a stream
    ///
    /// Only the status line and headers are awaited here; the body is read later by
    /// whoever consumes [`FetchedSource::body`].
    pub async fn fetch(&self, url: &str) -> Result<FetchedSource> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme {
                url: url.to_string(),
                scheme: parsed.scheme().to_string(),
            }
            .into());
        }

        let base_name = derive_base_name(url)?;
        debug!(url = %url, base_name = %base_name, "fetching source archive");

        let response = self.client.get(url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "timed out waiting for response".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            FetchError::Request {
                url: url.to_string(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let content_length = response.content_length();
        info!(url = %url, ?content_length, "source archive opened");

        let stream = response.bytes_stream().map_err(std::io::Error::other);

        Ok(FetchedSource {
            base_name,
            content_length,
            body: Box::pin(StreamReader::new(stream)),
        })
    }
}
