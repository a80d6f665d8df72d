//! Artifact store contract
//!
//! Deliverables go to an external object store that returns a time-limited
//! signed URL. Upload must complete before capture is ever attempted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use paymesh_types::{PayMeshError, Result, SignedUrl};
use rand::Rng;
use tokio::sync::RwLock;

/// External artifact store
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` at `path` and return a time-limited retrievable URL
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<SignedUrl>;
}

/// In-memory artifact store
///
/// Stands in for the external store in the server wiring and in tests.
/// Signed URLs expire after 24 hours, matching the external store's default.
pub struct MemoryArtifactStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_uploads: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Make subsequent uploads fail
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Fetch the bytes a signed URL points at, if the object exists
    pub async fn resolve(&self, url: &SignedUrl) -> Option<Vec<u8>> {
        let path = url
            .url
            .strip_prefix("memory://artifacts/")?
            .split('?')
            .next()?;
        self.objects.read().await.get(path).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

impl Default for MemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<SignedUrl> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PayMeshError::ArtifactStorageFailure {
                message: format!("upload to {path} failed"),
            });
        }

        self.objects.write().await.insert(path.to_string(), bytes);

        let sig: [u8; 16] = rand::thread_rng().gen();
        Ok(SignedUrl {
            url: format!("memory://artifacts/{path}?sig={}", hex::encode(sig)),
            expires_at: Utc::now() + Duration::hours(24),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_resolve() {
        let store = MemoryArtifactStore::new();
        let url = store
            .upload(b"proposal body".to_vec(), "deliverables/acct_a/pi_1.txt")
            .await
            .unwrap();

        assert!(url.expires_at > Utc::now());
        assert_eq!(
            store.resolve(&url).await.as_deref(),
            Some(b"proposal body".as_ref())
        );
    }

    #[tokio::test]
    async fn test_failed_upload_stores_nothing() {
        let store = MemoryArtifactStore::new();
        store.set_fail_uploads(true);
        let result = store.upload(b"x".to_vec(), "deliverables/a/b.txt").await;
        assert!(matches!(
            result,
            Err(PayMeshError::ArtifactStorageFailure { .. })
        ));
        assert_eq!(store.object_count().await, 0);
    }
}
