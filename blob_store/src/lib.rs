//! Storage adapters for the blob gateway.
//!
//! Every backend implements the two method [`BlobStore`] capability: `put`
//! stores bytes under a caller key and returns an opaque locator, `get`
//! returns the bytes behind a locator. Only the adapter that produced a
//! locator knows how to interpret it.
//!
//! The filesystem ([`DiskStorage`]) and object store ([`S3Storage`]) adapters
//! live here. The embedded database adapter lives in `state_store` because it
//! shares the database with the metadata index.

mod config;
mod disk;
mod error;
mod s3;
pub mod sanitize;

use async_trait::async_trait;
use bytes::Bytes;
pub use config::{default_disk_storage_path, DiskStorageConfig, S3Config};
use data_model::Backend;
pub use disk::DiskStorage;
pub use error::{BlobError, BlobResult};
pub use s3::S3Storage;
pub use sanitize::{sanitize, sanitize_to_path};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// The backend this adapter writes to.
    fn kind(&self) -> Backend;

    /// Store `data` under `key` and return the locator to read it back.
    ///
    /// Writes are last-write-wins at this layer, detecting duplicate ids is
    /// left to the caller.
    async fn put(&self, key: &str, data: Bytes) -> BlobResult<String>;

    /// Read the bytes behind a locator returned by [`BlobStore::put`].
    ///
    /// Returns `BlobError::NotFound` if nothing is stored there.
    async fn get(&self, locator: &str) -> BlobResult<Bytes>;
}
