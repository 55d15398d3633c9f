use std::sync::Arc;

use async_trait::async_trait;
use blob_store::{BlobError, BlobResult, BlobStore};
use bytes::Bytes;
use data_model::Backend;
use tracing::debug;

use crate::BlobState;

/// Stores payloads as rows of the `BlobPayloads` column family.
///
/// Rows are keyed by the caller id as-is, the key space has no notion of
/// paths so nothing needs sanitizing. `put` replaces an existing row, same as
/// the other backends overwrite at their storage layer.
pub struct DatabaseStorage {
    state: Arc<BlobState>,
}

impl DatabaseStorage {
    pub fn new(state: Arc<BlobState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl BlobStore for DatabaseStorage {
    fn kind(&self) -> Backend {
        Backend::Database
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> BlobResult<String> {
        self.state
            .put_payload(key, &data)
            .map_err(|e| BlobError::Other(e.into()))?;
        debug!(id = %key, "stored blob in database");
        Ok(key.to_string())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, locator: &str) -> BlobResult<Bytes> {
        match self.state.get_payload(locator) {
            Ok(Some(data)) => Ok(Bytes::from(data)),
            Ok(None) => Err(BlobError::not_found(locator)),
            Err(e) => Err(BlobError::Other(e.into())),
        }
    }
}
