use std::{collections::HashMap, sync::Arc};

use base64::{
    alphabet,
    engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
    Engine as _,
};
use blob_store::{BlobError, BlobStore};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use data_model::{Backend, BlobMetadataBuilder};
use state_store::{BlobState, StateStoreError};
use tracing::{error, info, warn};

/// Standard alphabet with canonical padding. Non-zero trailing bits in the
/// last symbol are ignored, so `aGVsbG9=` decodes like `aGVsbG8=`.
const PAYLOAD_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A stored blob as handed back to callers, payload base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobView {
    pub id: String,
    pub data: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid base64 data: {0}")]
    InvalidInput(String),

    #[error("id already exists for backend {backend}: {id}")]
    Conflict { backend: Backend, id: String },

    #[error("unknown id for backend {backend}: {id}")]
    NotFound { backend: Backend, id: String },

    /// The adapter failed to read or write, e.g. the store is unreachable.
    #[error("{backend} backend error: {source}")]
    Backend {
        backend: Backend,
        #[source]
        source: BlobError,
    },

    /// The index references an object the backend no longer has.
    #[error("object missing in {backend} backend. id: {id}, locator: {locator}")]
    MissingObject {
        backend: Backend,
        id: String,
        locator: String,
    },

    #[error("backend {0} is not configured")]
    BackendUnavailable(Backend),

    #[error("metadata index error: {0}")]
    Index(#[from] StateStoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Failures that originate in a storage backend rather than the request.
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Backend { .. }
                | GatewayError::MissingObject { .. }
                | GatewayError::BackendUnavailable(_)
        )
    }
}

type ClaimKey = (Backend, String);

/// Marks a (backend, id) pair as being stored by this process. Released on
/// drop, whatever the outcome of the store.
struct InflightClaim<'a> {
    inflight: &'a DashMap<ClaimKey, ()>,
    key: ClaimKey,
}

impl Drop for InflightClaim<'_> {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}

/// Orchestrates stores and retrieves across the registered backends.
///
/// Metadata is only recorded after the backend write succeeded, so the index
/// never references an object that was not written.
pub struct Gateway {
    state: Arc<BlobState>,
    backends: HashMap<Backend, Arc<dyn BlobStore>>,
    inflight: DashMap<ClaimKey, ()>,
}

impl Gateway {
    pub fn new(state: Arc<BlobState>) -> Self {
        Self {
            state,
            backends: HashMap::new(),
            inflight: DashMap::new(),
        }
    }

    pub fn with_backend(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.backends.insert(store.kind(), store);
        self
    }

    pub fn backends(&self) -> Vec<Backend> {
        let mut backends: Vec<Backend> = self.backends.keys().copied().collect();
        backends.sort();
        backends
    }

    fn backend(&self, backend: Backend) -> Result<&Arc<dyn BlobStore>, GatewayError> {
        self.backends
            .get(&backend)
            .ok_or(GatewayError::BackendUnavailable(backend))
    }

    fn claim(&self, backend: Backend, id: &str) -> Result<InflightClaim<'_>, GatewayError> {
        let key = (backend, id.to_string());
        match self.inflight.entry(key.clone()) {
            Entry::Occupied(_) => Err(GatewayError::Conflict {
                backend,
                id: id.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(());
                Ok(InflightClaim {
                    inflight: &self.inflight,
                    key,
                })
            }
        }
    }

    #[tracing::instrument(skip(self, encoded), fields(backend = %backend))]
    pub async fn store(
        &self,
        backend: Backend,
        id: &str,
        encoded: &str,
    ) -> Result<BlobView, GatewayError> {
        let data = PAYLOAD_DECODER
            .decode(encoded)
            .map_err(|e| GatewayError::InvalidInput(e.to_string()))?;
        let store = self.backend(backend)?;

        let _claim = self.claim(backend, id)?;
        if self.state.metadata_exists(backend, id)? {
            return Err(GatewayError::Conflict {
                backend,
                id: id.to_string(),
            });
        }

        let size = data.len() as u64;
        let locator = store
            .put(id, Bytes::from(data))
            .await
            .map_err(|source| {
                error!("backend write failed: {}", source);
                GatewayError::Backend { backend, source }
            })?;

        let metadata = BlobMetadataBuilder::default()
            .backend(backend)
            .id(id.to_string())
            .locator(locator)
            .size(size)
            .build()?;
        match self.state.insert_metadata(&metadata) {
            Ok(()) => {}
            Err(StateStoreError::AlreadyExists { .. }) => {
                // another process registered the id after our existence check
                warn!(
                    locator = %metadata.locator,
                    "lost metadata race, backend object may have been overwritten"
                );
                return Err(GatewayError::Conflict {
                    backend,
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(locator = %metadata.locator, size, "stored blob");
        Ok(BlobView {
            id: metadata.id,
            data: encoded.to_string(),
            size,
            created_at: metadata.created_at,
        })
    }

    #[tracing::instrument(skip(self), fields(backend = %backend))]
    pub async fn retrieve(&self, backend: Backend, id: &str) -> Result<BlobView, GatewayError> {
        let store = self.backend(backend)?;
        let metadata = match self.state.lookup_metadata(backend, id) {
            Ok(metadata) => metadata,
            Err(StateStoreError::NotFound { .. }) => {
                return Err(GatewayError::NotFound {
                    backend,
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let data = match store.get(&metadata.locator).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                error!(locator = %metadata.locator, "metadata exists but object is missing");
                return Err(GatewayError::MissingObject {
                    backend,
                    id: metadata.id,
                    locator: metadata.locator,
                });
            }
            Err(source) => return Err(GatewayError::Backend { backend, source }),
        };

        Ok(BlobView {
            id: metadata.id,
            data: STANDARD.encode(&data),
            size: metadata.size,
            created_at: metadata.created_at,
        })
    }
}
