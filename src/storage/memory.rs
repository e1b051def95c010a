//! In-memory object store

use super::ObjectStore;
use crate::Result;
use crate::error::PublishError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Object store that keeps everything in a map
///
/// Presigned URLs have the form `memory://{key}?expires={secs}` and are only
/// meaningful to this store. Clones share the same objects.
///
/// # Examples
///
/// ```
/// use repackage::storage::{MemoryStore, ObjectStore};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> repackage::Result<()> {
/// let store = MemoryStore::new();
/// store.put_object("a.zip", Bytes::from_static(b"PK")).await?;
///
/// assert_eq!(store.get("a.zip").as_deref(), Some(&b"PK"[..]));
/// assert_eq!(
///     store.presign_get("a.zip", Duration::from_secs(60)).await?,
///     "memory://a.zip?expires=60"
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_uploads: bool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose uploads always fail
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    /// Bytes stored under `key`
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()> {
        let upload_error = |reason: &str| PublishError::Upload {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if self.fail_uploads {
            return Err(upload_error("store rejects uploads").into());
        }

        self.objects
            .lock()
            .map_err(|_| upload_error("store lock poisoned"))?
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        if self.get(key).is_none() {
            return Err(PublishError::Presign {
                key: key.to_string(),
                reason: "no such object".to_string(),
            }
            .into());
        }
        Ok(format!("memory://{}?expires={}", key, expires_in.as_secs()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
