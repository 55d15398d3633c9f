use data_model::BlobMetadata;
use rocksdb::{ColumnFamily, TransactionDB};
use strum::AsRefStr;
use tracing::debug;

use crate::{serializer::JsonEncoder, StateStoreError};

#[derive(AsRefStr, strum::Display, strum::EnumIter, Clone, Copy, Debug)]
pub enum BlobObjectsColumns {
    BlobMetadata, //  Backend|Id -> BlobMetadata
    BlobPayloads, //  Id -> raw bytes, written by the db backend only
}

impl BlobObjectsColumns {
    pub fn cf<'a>(&self, db: &'a TransactionDB) -> Result<&'a ColumnFamily, StateStoreError> {
        db.cf_handle(self.as_ref())
            .ok_or_else(|| StateStoreError::MissingColumnFamily {
                name: self.to_string(),
            })
    }
}

/// Insert a metadata record, failing if the key is already taken.
///
/// The existence check and the write happen in one pessimistic transaction,
/// a second writer for the same key blocks on the row lock and then observes
/// the committed record.
pub(crate) fn insert_metadata(
    db: &TransactionDB,
    metadata: &BlobMetadata,
) -> Result<(), StateStoreError> {
    let cf = BlobObjectsColumns::BlobMetadata.cf(db)?;
    let key = metadata.key();
    let txn = db.transaction();
    if txn.get_for_update_cf(cf, &key, true)?.is_some() {
        return Err(StateStoreError::AlreadyExists {
            backend: metadata.backend,
            id: metadata.id.clone(),
        });
    }
    let serialized = JsonEncoder::encode(metadata)?;
    txn.put_cf(cf, &key, serialized)?;
    txn.commit()?;
    debug!(key = %key, "inserted blob metadata");
    Ok(())
}

/// Replace the payload row for `id`.
pub(crate) fn put_payload(db: &TransactionDB, id: &str, data: &[u8]) -> Result<(), StateStoreError> {
    let cf = BlobObjectsColumns::BlobPayloads.cf(db)?;
    let txn = db.transaction();
    if txn.get_for_update_cf(cf, id, true)?.is_some() {
        debug!(id = %id, "replacing existing payload row");
        txn.delete_cf(cf, id)?;
    }
    txn.put_cf(cf, id, data)?;
    txn.commit()?;
    Ok(())
}
