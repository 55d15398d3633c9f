use std::sync::Arc;

use data_model::{Backend, BlobMetadata};
use rocksdb::{IteratorMode, ReadOptions, TransactionDB};

use crate::{serializer::JsonEncoder, state_machine::BlobObjectsColumns, StateStoreError};

/// Read side of the state store, reads only see committed transactions.
pub struct StateReader {
    db: Arc<TransactionDB>,
}

impl StateReader {
    pub fn new(db: Arc<TransactionDB>) -> Self {
        Self { db }
    }

    pub fn get_metadata(
        &self,
        backend: Backend,
        id: &str,
    ) -> Result<Option<BlobMetadata>, StateStoreError> {
        let cf = BlobObjectsColumns::BlobMetadata.cf(&self.db)?;
        let key = BlobMetadata::key_from(backend, id);
        match self.db.get_cf(cf, key)? {
            Some(value) => Ok(Some(JsonEncoder::decode(&value)?)),
            None => Ok(None),
        }
    }

    pub fn metadata_exists(&self, backend: Backend, id: &str) -> Result<bool, StateStoreError> {
        let cf = BlobObjectsColumns::BlobMetadata.cf(&self.db)?;
        let key = BlobMetadata::key_from(backend, id);
        Ok(self.db.get_cf(cf, key)?.is_some())
    }

    pub fn get_payload(&self, id: &str) -> Result<Option<Vec<u8>>, StateStoreError> {
        let cf = BlobObjectsColumns::BlobPayloads.cf(&self.db)?;
        Ok(self.db.get_cf(cf, id)?)
    }

    /// Number of rows in a column family.
    pub fn count(&self, column: BlobObjectsColumns) -> Result<usize, StateStoreError> {
        let cf = column.cf(&self.db)?;
        let mut count = 0;
        for item in self
            .db
            .iterator_cf_opt(cf, ReadOptions::default(), IteratorMode::Start)
        {
            item?;
            count += 1;
        }
        Ok(count)
    }
}
