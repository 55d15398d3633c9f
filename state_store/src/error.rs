use data_model::Backend;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StateStoreError {
    /// The (backend, id) pair is already registered, or another writer holds
    /// the key.
    #[error("blob metadata already exists. backend: {}, id: {}", backend, id)]
    AlreadyExists { backend: Backend, id: String },

    #[error("blob metadata not found. backend: {}, id: {}", backend, id)]
    NotFound { backend: Backend, id: String },

    #[error("failed to create state store dir {}. error: {}", path, source)]
    CreateDirFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to open state store at {}. error: {}", path, source)]
    OpenDatabaseFailed {
        path: String,
        source: rocksdb::Error,
    },

    #[error("missing column family {}", name)]
    MissingColumnFamily { name: String },

    #[error("failed to decode a serialized record. error: {}", source)]
    JsonDecoderFailed { source: anyhow::Error },

    #[error("failed to encode a new serialized record. error: {}", source)]
    JsonEncoderFailed { source: anyhow::Error },

    #[error(transparent)]
    RocksDBFailure {
        #[from]
        source: rocksdb::Error,
    },
}

impl StateStoreError {
    pub fn is_lock_contention(&self) -> bool {
        matches!(
            self,
            StateStoreError::RocksDBFailure { source }
                if matches!(source.kind(), rocksdb::ErrorKind::Busy | rocksdb::ErrorKind::TimedOut)
        )
    }
}
