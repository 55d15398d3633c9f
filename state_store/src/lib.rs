use std::{fs, path::PathBuf, sync::Arc};

use data_model::{Backend, BlobMetadata};
use rocksdb::{ColumnFamilyDescriptor, Options, TransactionDB, TransactionDBOptions};
use scanner::StateReader;
use state_machine::BlobObjectsColumns;
use strum::IntoEnumIterator;
use tracing::{info, warn};

mod error;
pub mod payloads;
pub mod scanner;
mod serializer;
pub mod state_machine;

pub use error::StateStoreError;
pub use payloads::DatabaseStorage;

/// Durable state of the gateway: the metadata index and the payload table of
/// the db backend, two column families in one RocksDB transaction database.
pub struct BlobState {
    db: Arc<TransactionDB>,
    path: PathBuf,
}

impl BlobState {
    pub fn open(path: PathBuf) -> Result<Arc<Self>, StateStoreError> {
        fs::create_dir_all(&path).map_err(|source| StateStoreError::CreateDirFailed {
            path: path.display().to_string(),
            source,
        })?;

        let column_families = BlobObjectsColumns::iter()
            .map(|cf| ColumnFamilyDescriptor::new(cf.to_string(), Options::default()));
        let mut db_opts = Options::default();
        db_opts.create_missing_column_families(true);
        db_opts.create_if_missing(true);
        let db = TransactionDB::open_cf_descriptors(
            &db_opts,
            &TransactionDBOptions::default(),
            &path,
            column_families,
        )
        .map_err(|source| StateStoreError::OpenDatabaseFailed {
            path: path.display().to_string(),
            source,
        })?;

        info!(path = %path.display(), "initialized state store");
        Ok(Arc::new(Self {
            db: Arc::new(db),
            path,
        }))
    }

    pub fn reader(&self) -> StateReader {
        StateReader::new(self.db.clone())
    }

    pub fn metadata_exists(&self, backend: Backend, id: &str) -> Result<bool, StateStoreError> {
        self.reader().metadata_exists(backend, id)
    }

    /// Record a stored blob. The (backend, id) pair is unique, a second insert
    /// fails with `StateStoreError::AlreadyExists` even when both writers
    /// raced past [`BlobState::metadata_exists`].
    #[tracing::instrument(skip(self, metadata), fields(backend = %metadata.backend, id = %metadata.id))]
    pub fn insert_metadata(&self, metadata: &BlobMetadata) -> Result<(), StateStoreError> {
        state_machine::insert_metadata(&self.db, metadata).map_err(|e| {
            if e.is_lock_contention() {
                warn!("metadata key is locked by another writer: {}", e);
                return StateStoreError::AlreadyExists {
                    backend: metadata.backend,
                    id: metadata.id.clone(),
                };
            }
            e
        })
    }

    pub fn lookup_metadata(
        &self,
        backend: Backend,
        id: &str,
    ) -> Result<BlobMetadata, StateStoreError> {
        self.reader()
            .get_metadata(backend, id)?
            .ok_or_else(|| StateStoreError::NotFound {
                backend,
                id: id.to_string(),
            })
    }

    pub fn put_payload(&self, id: &str, data: &[u8]) -> Result<(), StateStoreError> {
        state_machine::put_payload(&self.db, id, data)
    }

    pub fn get_payload(&self, id: &str) -> Result<Option<Vec<u8>>, StateStoreError> {
        self.reader().get_payload(id)
    }

    /// Release this handle. Returns true if it was the last one and the
    /// database is closed, false if other handles keep it open.
    pub fn close(self: Arc<Self>) -> bool {
        match Arc::try_unwrap(self) {
            Ok(state) => {
                info!(path = %state.path.display(), "closing state store");
                drop(state);
                true
            }
            Err(shared) => {
                warn!(
                    path = %shared.path.display(),
                    handles = Arc::strong_count(&shared) - 1,
                    "state store still has open handles, database stays open"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::{TimeZone, Utc};
    use data_model::BlobMetadataBuilder;
    use tempfile::tempdir;

    use super::*;

    fn metadata(backend: Backend, id: &str, locator: &str) -> BlobMetadata {
        BlobMetadataBuilder::default()
            .backend(backend)
            .id(id.to_string())
            .locator(locator.to_string())
            .size(5)
            .created_at(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let state = BlobState::open(dir.path().join("state"))?;

        assert!(!state.metadata_exists(Backend::Local, "a/b")?);
        let meta = metadata(Backend::Local, "a/b", "a/b");
        state.insert_metadata(&meta)?;

        assert!(state.metadata_exists(Backend::Local, "a/b")?);
        assert_eq!(state.lookup_metadata(Backend::Local, "a/b")?, meta);
        Ok(())
    }

    #[test]
    fn test_ids_are_scoped_per_backend() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let state = BlobState::open(dir.path().to_path_buf())?;

        state.insert_metadata(&metadata(Backend::Local, "x", "x"))?;
        state.insert_metadata(&metadata(Backend::ObjectStore, "x", "x"))?;

        assert!(!state.metadata_exists(Backend::Database, "x")?);
        assert!(matches!(
            state.lookup_metadata(Backend::Database, "x"),
            Err(StateStoreError::NotFound { .. })
        ));
        assert_eq!(
            state
                .reader()
                .count(BlobObjectsColumns::BlobMetadata)?,
            2
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_insert_keeps_first_record() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let state = BlobState::open(dir.path().to_path_buf())?;

        let first = metadata(Backend::Database, "dup", "first");
        state.insert_metadata(&first)?;
        let result = state.insert_metadata(&metadata(Backend::Database, "dup", "second"));
        assert!(matches!(result, Err(StateStoreError::AlreadyExists { .. })));
        assert_eq!(state.lookup_metadata(Backend::Database, "dup")?.locator, "first");
        Ok(())
    }

    #[test]
    fn test_concurrent_inserts_admit_one_writer() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let state = BlobState::open(dir.path().to_path_buf())?;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                thread::spawn(move || {
                    state.insert_metadata(&metadata(Backend::Local, "race", &format!("loc-{i}")))
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(()) => successes += 1,
                Err(StateStoreError::AlreadyExists { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(
            state.reader().count(BlobObjectsColumns::BlobMetadata)?,
            1
        );
        Ok(())
    }

    #[test]
    fn test_close_with_live_handles_keeps_database_open() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let state = BlobState::open(dir.path().to_path_buf())?;
        let payloads = DatabaseStorage::new(state.clone());

        assert!(!state.close());
        drop(payloads);

        // the lock was released with the last handle
        let reopened = BlobState::open(dir.path().to_path_buf())?;
        assert!(reopened.close());
        Ok(())
    }

    #[test]
    fn test_state_survives_reopen() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let meta = metadata(Backend::ObjectStore, "persist", "persist");
        {
            let state = BlobState::open(dir.path().to_path_buf())?;
            state.insert_metadata(&meta)?;
            state.put_payload("persist", b"bytes")?;
            assert!(state.close());
        }

        let state = BlobState::open(dir.path().to_path_buf())?;
        assert_eq!(state.lookup_metadata(Backend::ObjectStore, "persist")?, meta);
        assert_eq!(state.get_payload("persist")?, Some(b"bytes".to_vec()));
        Ok(())
    }
}
