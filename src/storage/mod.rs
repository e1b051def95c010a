//! Object storage for converted archives
//!
//! Presigned delivery uploads the ZIP to a bucket and hands out a time-limited GET
//! URL instead of the bytes. The [`ObjectStore`] trait is the seam between the
//! service and the storage backend:
//!
//! - [`S3Store`]: any S3-compatible endpoint (AWS, Backblaze B2, MinIO)
//! - [`MemoryStore`]: keeps objects in memory, for tests and local runs
//!
//! ## Usage
//!
//! ```no_run
//! use repackage::config::StorageConfig;
//! use repackage::storage::{ObjectStore, S3Store};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! # async fn example(config: StorageConfig) -> repackage::Result<()> {
//! let store = S3Store::new(&config);
//! store.put_object("out/release.zip", Bytes::from_static(b"PK")).await?;
//! let url = store
//!     .presign_get("out/release.zip", Duration::from_secs(3600))
//!     .await?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```

mod memory;
mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Content type of every stored object
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Bucket-style storage that can mint presigned retrieval URLs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object
    ///
    /// # Errors
    ///
    /// [`PublishError::Upload`](crate::error::PublishError::Upload) if the backend rejects the write.
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()>;

    /// Create a URL granting GET access to `key` for `expires_in`
    ///
    /// # Errors
    ///
    /// [`PublishError::Presign`](crate::error::PublishError::Presign) if no URL can be produced.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
