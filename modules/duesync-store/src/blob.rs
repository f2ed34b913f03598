// Blob storage for raw fetched HTML. Paths are `<namespace>/<md5(url)>.html`
// where the namespace is the owning job sync id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{Result, StoreError};

/// Derive the storage key for a page URL.
pub fn blob_key(url: &str) -> String {
    format!("{:x}.html", md5::compute(url.as_bytes()))
}

/// Content-addressed HTML storage. Writes are idempotent: putting the same
/// `(namespace, key)` twice yields the same path and overwrites the payload.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<String>;
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
}

/// Object-storage REST backend (Supabase-style bucket API).
pub struct BucketStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl BucketStore {
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl BlobStore for BucketStore {
    async fn put(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<String> {
        let path = format!("{namespace}/{key}");
        let url = self.object_url(&path);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("Content-Type", "text/html")
            .header("Cache-Control", "3600")
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(path);
        }

        // Some backends reject upsert-on-create; fall back to an update.
        let status = resp.status();
        warn!(path, %status, "Blob upload rejected, retrying as update");

        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.service_key)
            .header("Content-Type", "text/html")
            .header("Cache-Control", "3600")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))?;

        if resp.status().is_success() {
            Ok(path)
        } else {
            Err(StoreError::BackendUnavailable(format!(
                "upload failed with status {} for {path}",
                resp.status()
            )))
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.object_url(path);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp
                .bytes()
                .await
                .map_err(|e| StoreError::BackendUnavailable(e.to_string()))?
                .to_vec())
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(StoreError::BlobNotFound(path.to_string()))
        } else {
            Err(StoreError::BackendUnavailable(format!(
                "download failed with status {status} for {path}"
            )))
        }
    }
}

/// In-memory blob store for tests and local runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<String> {
        let path = format!("{namespace}/{key}");
        self.objects
            .write()
            .await
            .insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(path.to_string()))
    }
}
