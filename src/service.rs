//! Request orchestration: fetch, transcode, deliver

use crate::config::{Config, DeliveryConfig, DeliveryMode};
use crate::error::{Error, PublishError, Result};
use crate::fetch::Fetcher;
use crate::storage::ObjectStore;
use crate::transcode::{TranscodeOutput, TranscodeStats, Transcoder};
use crate::utils::{object_key, output_file_name};
use bytes::Bytes;
use chrono::Utc;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;
use tokio_util::io::SyncIoBridge;
use tracing::{debug, info, warn};

/// Result of a successful conversion
#[derive(Debug, Clone)]
pub enum ConvertOutcome {
    /// The ZIP is returned to the caller directly
    Inline {
        /// Delivered file name, `{base}.zip`
        file_name: String,
        /// ZIP bytes
        archive: Bytes,
        /// Conversion statistics
        stats: TranscodeStats,
    },
    /// The ZIP was uploaded and can be fetched from `url`
    Stored {
        /// Delivered file name, `{base}.zip`
        file_name: String,
        /// Object key in the bucket
        key: String,
        /// Presigned GET URL
        url: String,
        /// Lifetime of `url`
        expires_in: Duration,
        /// Conversion statistics
        stats: TranscodeStats,
    },
}

impl ConvertOutcome {
    /// Delivered file name
    pub fn file_name(&self) -> &str {
        match self {
            ConvertOutcome::Inline { file_name, .. } | ConvertOutcome::Stored { file_name, .. } => {
                file_name
            }
        }
    }

    /// Conversion statistics
    pub fn stats(&self) -> &TranscodeStats {
        match self {
            ConvertOutcome::Inline { stats, .. } | ConvertOutcome::Stored { stats, .. } => stats,
        }
    }
}

/// Converts remote tar.zst archives into delivered ZIP files
///
/// Cheap to share behind an [`Arc`]: it holds only immutable configuration and
/// clients. Every call to [`convert`](Self::convert) is independent.
pub struct Repackager {
    fetcher: Fetcher,
    transcoder: Transcoder,
    store: Option<Arc<dyn ObjectStore>>,
    delivery: DeliveryConfig,
    request_timeout: Duration,
}

impl std::fmt::Debug for Repackager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repackager")
            .field("transcoder", &self.transcoder)
            .field("store", &self.store.as_ref().map(|s| s.name()))
            .field("delivery", &self.delivery)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Repackager {
    /// Build a repackager from configuration and an optional object store
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when presigned delivery is configured without a
    /// store, or when the HTTP client cannot be built.
    pub fn new(config: &Config, store: Option<Arc<dyn ObjectStore>>) -> Result<Self> {
        if config.delivery.mode == DeliveryMode::Presigned && store.is_none() {
            return Err(Error::Config {
                message: "presigned delivery requires an object store".into(),
                key: Some("storage".into()),
            });
        }

        Ok(Self {
            fetcher: Fetcher::new(&config.fetch)?,
            transcoder: Transcoder::new(config.transcode.clone()),
            store,
            delivery: config.delivery.clone(),
            request_timeout: config.service.request_timeout,
        })
    }

    /// Delivery settings in use
    pub fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    /// Fetch `url`, convert it to ZIP and deliver it per the configured mode
    ///
    /// The whole sequence is bounded by the configured request timeout. No step is
    /// retried; the first failure is returned as is.
    pub async fn convert(&self, url: &str) -> Result<ConvertOutcome> {
        let started = Instant::now();
        info!(url = %url, mode = ?self.delivery.mode, "conversion requested");

        let result = match tokio::time::timeout(self.request_timeout, self.run(url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.request_timeout)),
        };

        match &result {
            Ok(outcome) => info!(
                url = %url,
                file_name = %outcome.file_name(),
                entries = outcome.stats().entries_written,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "conversion finished"
            ),
            Err(e) => warn!(
                url = %url,
                stage = e.stage(),
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "conversion failed"
            ),
        }

        result
    }

    async fn run(&self, url: &str) -> Result<ConvertOutcome> {
        let source = self.fetcher.fetch(url).await?;
        let file_name = output_file_name(&source.base_name);

        let TranscodeOutput { archive, stats } = self.transcode(source.body).await?;

        match self.delivery.mode {
            DeliveryMode::Inline => Ok(ConvertOutcome::Inline {
                file_name,
                archive,
                stats,
            }),
            DeliveryMode::Presigned => {
                let key = object_key(&self.delivery.key_prefix, &source.base_name, Utc::now());
                let url = self.publish(&key, archive).await?;
                Ok(ConvertOutcome::Stored {
                    file_name,
                    key,
                    url,
                    expires_in: self.delivery.presign_expiry,
                    stats,
                })
            }
        }
    }

    /// Run the blocking transcoder over the async body on a blocking thread
    async fn transcode(&self, body: Pin<Box<dyn AsyncRead + Send>>) -> Result<TranscodeOutput> {
        let transcoder = self.transcoder.clone();
        let reader = SyncIoBridge::new(body);

        tokio::task::spawn_blocking(move || transcoder.transcode(reader))
            .await
            .map_err(|e| Error::Other(format!("transcode task failed: {}", e)))?
    }

    async fn publish(&self, key: &str, archive: Bytes) -> Result<String> {
        let store = self.store.as_ref().ok_or(PublishError::NotConfigured)?;

        debug!(store = store.name(), key = %key, size = archive.len(), "uploading archive");
        store.put_object(key, archive).await?;
        store.presign_get(key, self.delivery.presign_expiry).await
    }
}
