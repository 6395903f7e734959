use crate::error::{GatewayError, GatewayResult};
use crate::http::DEFAULT_TIMEOUT;
use crate::metadata::CallMetadata;
use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;

/// Read access to key-addressed blobs.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob, `None` if no object exists under `key`.
    async fn get(&self, key: &str, metadata: &CallMetadata) -> GatewayResult<Option<Bytes>>;
}

/// Object store-based blob store (S3, MinIO, in-memory for tests)
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    timeout: Duration,
}

impl ObjectStoreBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn object_path(&self, key: &str) -> Path {
        if self.prefix.is_empty() {
            Path::from(key)
        } else {
            Path::from(format!("{}/{}", self.prefix, key))
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn get(&self, key: &str, metadata: &CallMetadata) -> GatewayResult<Option<Bytes>> {
        let path = self.object_path(key);

        let read = async {
            let result = self.store.get(&path).await?;
            result.bytes().await
        };

        match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(bytes)) => Ok(Some(bytes)),
            Ok(Err(object_store::Error::NotFound { .. })) => Ok(None),
            Ok(Err(e)) => Err(GatewayError::upstream(
                format!("Object store read of '{}' failed: {}", path, e),
                None,
                metadata,
            )),
            Err(_) => Err(GatewayError::upstream(
                format!(
                    "Object store read of '{}' timed out after {} ms",
                    path,
                    self.timeout.as_millis()
                ),
                None,
                metadata,
            )),
        }
    }
}
