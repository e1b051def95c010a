//! # repackage
//!
//! Converts remote `.tar.zst` archives into ZIP files.
//!
//! The archive is fetched over HTTP and decompressed, demultiplexed and
//! re-encoded in a single forward pass; the resulting ZIP is either returned
//! inline or uploaded to S3-compatible storage and handed out as a presigned URL.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repackage::{Config, ConvertOutcome, Repackager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repackager = Repackager::new(&Config::default(), None)?;
//!
//!     let outcome = repackager
//!         .convert("https://example.com/releases/file1.tar.zst")
//!         .await?;
//!
//!     if let ConvertOutcome::Inline { file_name, archive, .. } = outcome {
//!         std::fs::write(file_name, archive)?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! The transcoder can also be used on its own, over any [`std::io::Read`]:
//! see [`transcode::Transcoder`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Source archive fetching
pub mod fetch;
/// Fetch, transcode and deliver
pub mod service;
/// Object storage for presigned delivery
pub mod storage;
/// tar.zst to ZIP transcoding
pub mod transcode;
/// Naming helpers
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DeliveryMode, StorageConfig};
pub use error::{
    ApiError, Error, ErrorDetail, FetchError, PublishError, Result, ToHttpStatus, TranscodeError,
};
pub use fetch::{FetchedSource, Fetcher};
pub use service::{ConvertOutcome, Repackager};
pub use storage::{MemoryStore, ObjectStore, S3Store};
pub use transcode::{TranscodeOutput, TranscodeStats, Transcoder};

/// Resolve when the process is asked to stop
///
/// - **Unix:** SIGTERM or SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Pass it to [`api::start_api_server`] for graceful shutdown.
pub async fn shutdown_signal() {
    wait_for_signal().await;
    tracing::info!("Shutdown requested");
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Failed to register SIGTERM handler, listening for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Failed to register SIGINT handler, listening for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
